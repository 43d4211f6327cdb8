pub mod access;
pub mod builder;
pub mod choices;
pub mod request;
pub mod store;

mod error;

pub use access::Viewer;
pub use builder::{AllowedForumSet, PostHit, SearchQueryBuilder};
pub use choices::{ForumChoice, scope_choices};
pub use error::{Error, Result};
pub use machina_storage::{
	models::{Forum, PostRow},
	posts::{MatchMode, PostQuery, SearchVector, TextFields},
};
pub use request::{FormBool, FormValue, SearchParams, SearchRequest};
pub use store::{PgPermissionOracle, PgPostStore};

use std::{future::Future, pin::Pin, sync::Arc};

use serde::Serialize;

use machina_config::Search;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Decides who is asking and which forums they may read.
pub trait PermissionOracle
where
	Self: Send + Sync,
{
	/// Maps a caller id to a viewer. `None` is an anonymous visitor; an unknown id is an error.
	fn resolve_viewer<'a>(&'a self, user_id: Option<i64>) -> BoxFuture<'a, Result<Viewer>>;

	/// Readable forums in display order.
	fn readable_forums<'a>(&'a self, viewer: &'a Viewer) -> BoxFuture<'a, Result<Vec<Forum>>>;
}

/// Executes resolved post queries.
pub trait PostStore
where
	Self: Send + Sync,
{
	fn search_posts<'a>(&'a self, query: &'a PostQuery) -> BoxFuture<'a, Result<Vec<PostRow>>>;
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
	pub choices: Vec<ForumChoice>,
	/// `None` when no search ran, as opposed to a search without matches.
	pub results: Option<Vec<PostHit>>,
}

pub struct ForumSearch {
	pub cfg: Search,
	pub builder: SearchQueryBuilder,
	oracle: Arc<dyn PermissionOracle>,
	store: Arc<dyn PostStore>,
}
impl ForumSearch {
	pub fn new(cfg: Search, oracle: Arc<dyn PermissionOracle>, store: Arc<dyn PostStore>) -> Self {
		let builder = SearchQueryBuilder::from_config(&cfg);

		Self { cfg, builder, oracle, store }
	}

	pub fn postgres(cfg: Search, pool: sqlx::PgPool) -> Self {
		let store = PgPostStore::new(pool.clone(), cfg.text_search_config.clone());
		let oracle = PgPermissionOracle::new(pool);

		Self::new(cfg, Arc::new(oracle), Arc::new(store))
	}

	pub async fn resolve_viewer(&self, user_id: Option<i64>) -> Result<Viewer> {
		self.oracle.resolve_viewer(user_id).await
	}

	/// Readable forums rendered as scope choices, without running a search.
	pub async fn choices(&self, viewer: &Viewer) -> Result<Vec<ForumChoice>> {
		let readable = self.oracle.readable_forums(viewer).await?;

		Ok(scope_choices(&readable))
	}

	/// Validates `params` for `viewer` and runs the search.
	///
	/// Permissions are consulted exactly once; the same forum list feeds the scope choices, the
	/// validation of submitted scopes and the default scope.
	pub async fn search(&self, viewer: &Viewer, params: SearchParams) -> Result<SearchPage> {
		let readable = self.oracle.readable_forums(viewer).await?;
		let choices = scope_choices(&readable);
		let allowed = AllowedForumSet::from_forums(&readable);
		let request = params.validate(&allowed, self.cfg.poster_name_max_chars)?;
		let results =
			self.builder.build_and_execute(self.store.as_ref(), &request, &allowed).await?;

		tracing::info!(
			user_id = ?viewer.user_id(),
			engine = self.builder.engine().as_str(),
			allowed_forums = allowed.len(),
			searched = results.is_some(),
			hits = results.as_ref().map(Vec::len).unwrap_or(0),
			"Forum search completed."
		);

		Ok(SearchPage { choices, results })
	}
}
