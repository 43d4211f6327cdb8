//! Postgres-backed implementations of the search seams.

use sqlx::PgPool;

use machina_storage::{
	forums,
	models::{Forum, PostRow},
	posts::{self, PostQuery},
};

use crate::{BoxFuture, PermissionOracle, PostStore, Result, Viewer, access};

#[derive(Clone)]
pub struct PgPostStore {
	pool: PgPool,
	text_search_config: String,
}
impl PgPostStore {
	pub fn new(pool: PgPool, text_search_config: impl Into<String>) -> Self {
		Self { pool, text_search_config: text_search_config.into() }
	}
}
impl PostStore for PgPostStore {
	fn search_posts<'a>(&'a self, query: &'a PostQuery) -> BoxFuture<'a, Result<Vec<PostRow>>> {
		Box::pin(async move {
			let rows =
				posts::search_posts(&self.pool, query, self.text_search_config.as_str()).await?;

			Ok(rows)
		})
	}
}

#[derive(Clone)]
pub struct PgPermissionOracle {
	pool: PgPool,
}
impl PgPermissionOracle {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}
}
impl PermissionOracle for PgPermissionOracle {
	fn resolve_viewer<'a>(&'a self, user_id: Option<i64>) -> BoxFuture<'a, Result<Viewer>> {
		Box::pin(async move {
			let Some(user_id) = user_id else {
				return Ok(Viewer::Anonymous);
			};
			let user = forums::find_user(&self.pool, user_id).await?;

			user.map(Viewer::User).ok_or(crate::Error::UnknownUser { user_id })
		})
	}

	fn readable_forums<'a>(&'a self, viewer: &'a Viewer) -> BoxFuture<'a, Result<Vec<Forum>>> {
		Box::pin(async move {
			let all = forums::list_forums(&self.pool).await?;

			if viewer.is_superuser() {
				return Ok(all);
			}

			let grants = forums::load_read_grants(&self.pool, viewer.user_id()).await?;
			let total = all.len();
			let readable = access::readable_forums(all, &grants, viewer);

			tracing::debug!(
				user_id = ?viewer.user_id(),
				total,
				readable = readable.len(),
				"Resolved readable forums."
			);

			Ok(readable)
		})
	}
}
