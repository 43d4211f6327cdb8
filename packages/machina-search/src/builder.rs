use std::collections::BTreeSet;

use serde::Serialize;
use time::OffsetDateTime;

use machina_config::{MAX_SEARCH_RESULTS, Search, SearchEngine};
use machina_storage::{
	models::{Forum, PostRow},
	posts::{MatchMode, PostQuery, SearchVector, TextFields},
};

use crate::{PostStore, Result, SearchRequest};

/// Forum ids a viewer may read for the duration of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedForumSet(BTreeSet<i64>);
impl AllowedForumSet {
	pub fn from_forums(forums: &[Forum]) -> Self {
		forums.iter().map(|forum| forum.forum_id).collect()
	}

	pub fn contains(&self, forum_id: i64) -> bool {
		self.0.contains(&forum_id)
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
		self.0.iter().copied()
	}
}
impl FromIterator<i64> for AllowedForumSet {
	fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostHit {
	pub post_id: i64,
	pub topic_id: i64,
	pub forum_id: i64,
	pub subject: String,
	pub content: String,
	pub poster_id: Option<i64>,
	pub poster_username: Option<String>,
	pub username: Option<String>,
	/// Relevance score. Only ranked searches produce one.
	pub rank: Option<f32>,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}
impl PostHit {
	fn from_row(row: PostRow, ranked: bool) -> Self {
		Self {
			post_id: row.post_id,
			topic_id: row.topic_id,
			forum_id: row.forum_id,
			subject: row.subject,
			content: row.content,
			poster_id: row.poster_id,
			poster_username: row.poster_username,
			username: row.username,
			rank: ranked.then_some(row.rank),
			created_at: row.created_at,
		}
	}
}

/// Turns validated search requests into bounded, permission-scoped post queries.
#[derive(Debug, Clone, Copy)]
pub struct SearchQueryBuilder {
	engine: SearchEngine,
	max_results: u32,
}
impl SearchQueryBuilder {
	pub fn new(engine: SearchEngine, max_results: u32) -> Self {
		Self { engine, max_results: max_results.clamp(1, MAX_SEARCH_RESULTS) }
	}

	pub fn from_config(cfg: &Search) -> Self {
		Self::new(cfg.engine, cfg.max_results)
	}

	pub fn engine(&self) -> SearchEngine {
		self.engine
	}

	/// Returns `None` when no query should run: the request has no search terms, or the
	/// effective forum scope is empty.
	///
	/// An explicit scope is intersected with `allowed` so it can only narrow what the viewer sees.
	pub fn build(&self, request: &SearchRequest, allowed: &AllowedForumSet) -> Option<PostQuery> {
		let terms = request.query.as_deref().map(str::trim).filter(|terms| !terms.is_empty())?;
		let matcher = match self.engine {
			SearchEngine::Ranked => MatchMode::Ranked {
				vector: if request.search_topics_only {
					SearchVector::Subject
				} else {
					SearchVector::All
				},
				terms: terms.to_string(),
			},
			SearchEngine::Substring => MatchMode::Substring {
				fields: if request.search_topics_only {
					TextFields::Subject
				} else {
					TextFields::SubjectOrContent
				},
				needle: terms.to_string(),
			},
		};
		let poster_name = request
			.poster_name_filter
			.as_deref()
			.filter(|name| !name.is_empty())
			.map(str::to_string);
		let forum_ids: Vec<i64> = if request.forum_scope.is_empty() {
			allowed.iter().collect()
		} else {
			request.forum_scope.iter().copied().filter(|id| allowed.contains(*id)).collect()
		};

		if forum_ids.is_empty() {
			return None;
		}

		Some(PostQuery { matcher, poster_name, forum_ids, limit: self.max_results })
	}

	/// Builds the query and runs it against `store`.
	///
	/// `Ok(None)` means no query was performed, which differs from `Ok(Some(vec![]))`, a query
	/// that matched nothing. Store failures are returned as they are.
	pub async fn build_and_execute(
		&self,
		store: &dyn PostStore,
		request: &SearchRequest,
		allowed: &AllowedForumSet,
	) -> Result<Option<Vec<PostHit>>> {
		let Some(query) = self.build(request, allowed) else {
			tracing::debug!(engine = self.engine.as_str(), "Search skipped; nothing to query.");

			return Ok(None);
		};
		let rows = store.search_posts(&query).await?;
		let fetched = rows.len();
		let scope: BTreeSet<i64> = query.forum_ids.iter().copied().collect();
		let ranked = matches!(query.matcher, MatchMode::Ranked { .. });
		let hits: Vec<PostHit> = rows
			.into_iter()
			.filter(|row| scope.contains(&row.forum_id))
			.take(query.limit as usize)
			.map(|row| PostHit::from_row(row, ranked))
			.collect();

		if hits.len() < fetched {
			tracing::warn!(
				fetched,
				kept = hits.len(),
				"Post store returned rows outside the search scope or limit."
			);
		}

		tracing::debug!(
			engine = self.engine.as_str(),
			forums = query.forum_ids.len(),
			hits = hits.len(),
			"Search executed."
		);

		Ok(Some(hits))
	}
}
