use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};

use time::macros::datetime;

use machina_config::{Search, SearchEngine};
use machina_search::{
	BoxFuture, Error, Forum, ForumSearch, MatchMode, PermissionOracle, PostQuery, PostRow,
	PostStore, Result, SearchParams, SearchVector, TextFields, Viewer,
};
use machina_storage::models::ForumUser;

struct StoredPost {
	post_id: i64,
	forum_id: i64,
	subject: &'static str,
	content: &'static str,
	poster: Option<&'static str>,
	guest_name: Option<&'static str>,
}

struct MemoryPosts {
	posts: Vec<StoredPost>,
	queries: Arc<AtomicUsize>,
}
impl MemoryPosts {
	fn new(posts: Vec<StoredPost>) -> Self {
		Self { posts, queries: Arc::new(AtomicUsize::new(0)) }
	}

	fn query_count(&self) -> usize {
		self.queries.load(Ordering::SeqCst)
	}

	fn rank(post: &StoredPost, vector: SearchVector, terms: &str) -> Option<f32> {
		let text = match vector {
			SearchVector::Subject => post.subject.to_lowercase(),
			SearchVector::All => format!("{} {}", post.subject, post.content).to_lowercase(),
		};
		let mut score = 0.0;

		for term in terms.split_whitespace() {
			let hits = text.matches(term.to_lowercase().as_str()).count();

			if hits == 0 {
				return None;
			}

			score += hits as f32;
		}

		Some(score)
	}

	fn contains(haystack: &str, needle: &str) -> bool {
		haystack.to_lowercase().contains(&needle.to_lowercase())
	}
}
impl PostStore for MemoryPosts {
	fn search_posts<'a>(&'a self, query: &'a PostQuery) -> BoxFuture<'a, Result<Vec<PostRow>>> {
		self.queries.fetch_add(1, Ordering::SeqCst);

		let mut rows: Vec<PostRow> = self
			.posts
			.iter()
			.filter(|post| query.forum_ids.contains(&post.forum_id))
			.filter(|post| match query.poster_name.as_deref() {
				None => true,
				Some(name) =>
					post.poster.map(|poster| Self::contains(poster, name)).unwrap_or(false)
						|| post.guest_name == Some(name),
			})
			.filter_map(|post| {
				let rank = match &query.matcher {
					MatchMode::Ranked { vector, terms } => Self::rank(post, *vector, terms)?,
					MatchMode::Substring { fields, needle } => {
						let matched = Self::contains(post.subject, needle)
							|| (*fields == TextFields::SubjectOrContent
								&& Self::contains(post.content, needle));

						if !matched {
							return None;
						}

						0.0
					},
				};

				Some(PostRow {
					post_id: post.post_id,
					topic_id: post.post_id * 10,
					forum_id: post.forum_id,
					subject: post.subject.to_string(),
					content: post.content.to_string(),
					poster_id: post.poster.map(|_| post.post_id + 100),
					poster_username: post.poster.map(str::to_string),
					username: post.guest_name.map(str::to_string),
					created_at: datetime!(2024-01-01 00:00 UTC),
					rank,
				})
			})
			.collect();

		if matches!(query.matcher, MatchMode::Ranked { .. }) {
			rows.sort_by(|a, b| b.rank.total_cmp(&a.rank).then(a.post_id.cmp(&b.post_id)));
		}

		rows.truncate(query.limit as usize);

		Box::pin(async move { Ok(rows) })
	}
}

/// Ignores the query scope entirely.
struct LeakyPosts;
impl PostStore for LeakyPosts {
	fn search_posts<'a>(&'a self, _query: &'a PostQuery) -> BoxFuture<'a, Result<Vec<PostRow>>> {
		let rows = (1..=3)
			.map(|forum_id| PostRow {
				post_id: forum_id,
				topic_id: forum_id,
				forum_id,
				subject: "hello".to_string(),
				content: String::new(),
				poster_id: None,
				poster_username: None,
				username: Some("guest".to_string()),
				created_at: datetime!(2024-01-01 00:00 UTC),
				rank: 0.0,
			})
			.collect();

		Box::pin(async move { Ok(rows) })
	}
}

struct FailingPosts;
impl PostStore for FailingPosts {
	fn search_posts<'a>(&'a self, _query: &'a PostQuery) -> BoxFuture<'a, Result<Vec<PostRow>>> {
		Box::pin(async move { Err(Error::Storage { message: "connection reset".to_string() }) })
	}
}

struct FixedForums {
	forums: Vec<Forum>,
	calls: Arc<AtomicUsize>,
}
impl FixedForums {
	fn new(forums: Vec<Forum>) -> Self {
		Self { forums, calls: Arc::new(AtomicUsize::new(0)) }
	}
}
impl PermissionOracle for FixedForums {
	fn resolve_viewer<'a>(&'a self, user_id: Option<i64>) -> BoxFuture<'a, Result<Viewer>> {
		Box::pin(async move {
			Ok(match user_id {
				None => Viewer::Anonymous,
				Some(user_id) => Viewer::User(ForumUser {
					user_id,
					username: format!("user{user_id}"),
					is_superuser: false,
				}),
			})
		})
	}

	fn readable_forums<'a>(&'a self, _viewer: &'a Viewer) -> BoxFuture<'a, Result<Vec<Forum>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let forums = self.forums.clone();

		Box::pin(async move { Ok(forums) })
	}
}

fn forum(forum_id: i64, name: &str, margin_level: i32) -> Forum {
	Forum {
		forum_id,
		parent_id: None,
		name: name.to_string(),
		margin_level,
		tree_position: forum_id as i32,
		last_post_on: None,
	}
}

fn sample_posts() -> Vec<StoredPost> {
	vec![
		StoredPost {
			post_id: 1,
			forum_id: 1,
			subject: "Hello everyone",
			content: "Introductions thread.",
			poster: Some("alice_w"),
			guest_name: None,
		},
		StoredPost {
			post_id: 2,
			forum_id: 2,
			subject: "Build failure",
			content: "hello hello, my build fails",
			poster: Some("bob"),
			guest_name: None,
		},
		StoredPost {
			post_id: 3,
			forum_id: 3,
			subject: "Hello from a private forum",
			content: "secret",
			poster: Some("carol"),
			guest_name: None,
		},
		StoredPost {
			post_id: 4,
			forum_id: 1,
			subject: "Unrelated",
			content: "nothing to see",
			poster: None,
			guest_name: Some("Alice"),
		},
		StoredPost {
			post_id: 5,
			forum_id: 2,
			subject: "Question",
			content: "Say HELLO to the borrow checker",
			poster: None,
			guest_name: Some("Alice"),
		},
		StoredPost {
			post_id: 6,
			forum_id: 2,
			subject: "hello again",
			content: "posted by a guest called Alicia",
			poster: None,
			guest_name: Some("Alicia"),
		},
	]
}

fn search_cfg(engine: SearchEngine) -> Search {
	Search { engine, ..Search::default() }
}

fn params(json: serde_json::Value) -> SearchParams {
	serde_json::from_value(json).expect("Failed to decode params.")
}

fn service(
	engine: SearchEngine,
	readable: Vec<Forum>,
	store: Arc<dyn PostStore>,
) -> (ForumSearch, Arc<AtomicUsize>) {
	let oracle = FixedForums::new(readable);
	let calls = oracle.calls.clone();

	(ForumSearch::new(search_cfg(engine), Arc::new(oracle), store), calls)
}

fn ids(results: &Option<Vec<machina_search::PostHit>>) -> Vec<i64> {
	results.as_ref().expect("Expected a search to run.").iter().map(|hit| hit.post_id).collect()
}

#[tokio::test]
async fn substring_search_matches_subject_or_content_in_allowed_forums() {
	let (search, _) = service(
		SearchEngine::Substring,
		vec![forum(1, "General", 0), forum(2, "Help", 1)],
		Arc::new(MemoryPosts::new(sample_posts())),
	);
	let page = search
		.search(&Viewer::Anonymous, params(serde_json::json!({ "q": "hello" })))
		.await
		.expect("Search must succeed.");

	assert_eq!(ids(&page.results), vec![1, 2, 5, 6]);
	assert!(page.results.iter().flatten().all(|hit| hit.rank.is_none()));
	assert_eq!(page.choices.len(), 2);
	assert_eq!(page.choices[1].label, "- Help");
}

#[tokio::test]
async fn topic_only_substring_search_ignores_content() {
	let (search, _) = service(
		SearchEngine::Substring,
		vec![forum(1, "General", 0), forum(2, "Help", 0)],
		Arc::new(MemoryPosts::new(sample_posts())),
	);
	let page = search
		.search(
			&Viewer::Anonymous,
			params(serde_json::json!({ "q": "hello", "search_topics": "on" })),
		)
		.await
		.expect("Search must succeed.");

	assert_eq!(ids(&page.results), vec![1, 6]);
}

#[tokio::test]
async fn empty_query_returns_no_results_without_querying() {
	let store = Arc::new(MemoryPosts::new(sample_posts()));
	let (search, _) = service(SearchEngine::Substring, vec![forum(1, "General", 0)], store.clone());

	for raw in [
		serde_json::json!({}),
		serde_json::json!({ "q": "", "search_topics": true, "search_poster_name": "Alice", "search_forums": [1] }),
		serde_json::json!({ "q": "   " }),
	] {
		let page =
			search.search(&Viewer::Anonymous, params(raw)).await.expect("Search must succeed.");

		assert!(page.results.is_none());
		assert_eq!(page.choices.len(), 1);
	}

	assert_eq!(store.query_count(), 0);
}

#[tokio::test]
async fn no_readable_forums_returns_no_results() {
	let store = Arc::new(MemoryPosts::new(sample_posts()));
	let (search, _) = service(SearchEngine::Ranked, Vec::new(), store.clone());
	let page = search
		.search(&Viewer::Anonymous, params(serde_json::json!({ "q": "abc", "search_forums": [3] })))
		.await
		.expect("Search must succeed.");

	assert!(page.results.is_none());
	assert!(page.choices.is_empty());
	assert_eq!(store.query_count(), 0);
}

#[tokio::test]
async fn no_matches_is_an_empty_result_not_none() {
	let (search, _) = service(
		SearchEngine::Substring,
		vec![forum(1, "General", 0)],
		Arc::new(MemoryPosts::new(sample_posts())),
	);
	let page = search
		.search(&Viewer::Anonymous, params(serde_json::json!({ "q": "zzz-no-match" })))
		.await
		.expect("Search must succeed.");

	assert_eq!(page.results, Some(Vec::new()));
}

#[tokio::test]
async fn poster_filter_matches_registered_substring_or_exact_guest_name() {
	let (search, _) = service(
		SearchEngine::Substring,
		vec![forum(1, "General", 0), forum(2, "Help", 0)],
		Arc::new(MemoryPosts::new(sample_posts())),
	);
	let page = search
		.search(
			&Viewer::Anonymous,
			params(serde_json::json!({ "q": "e", "search_poster_name": "Alice" })),
		)
		.await
		.expect("Search must succeed.");

	// alice_w matches by substring, the "Alice" guest exactly. The "Alicia" guest does not.
	assert_eq!(ids(&page.results), vec![1, 4, 5]);

	for hit in page.results.iter().flatten() {
		let registered = hit
			.poster_username
			.as_deref()
			.map(|name| name.to_lowercase().contains("alice"))
			.unwrap_or(false);

		assert!(registered || hit.username.as_deref() == Some("Alice"));
	}
}

#[tokio::test]
async fn ranked_search_orders_by_descending_rank() {
	let (search, _) = service(
		SearchEngine::Ranked,
		vec![forum(1, "General", 0), forum(2, "Help", 0), forum(3, "Staff", 0)],
		Arc::new(MemoryPosts::new(sample_posts())),
	);
	let page = search
		.search(&Viewer::Anonymous, params(serde_json::json!({ "q": "hello" })))
		.await
		.expect("Search must succeed.");
	let results = page.results.expect("Expected a search to run.");
	let ranks: Vec<f32> = results.iter().map(|hit| hit.rank.expect("ranked hit")).collect();

	assert_eq!(results[0].post_id, 2);
	assert!(ranks.windows(2).all(|pair| pair[0] >= pair[1]), "Ranks not descending: {ranks:?}");
}

#[tokio::test]
async fn explicit_scope_narrows_results() {
	let (search, _) = service(
		SearchEngine::Substring,
		vec![forum(1, "General", 0), forum(2, "Help", 0)],
		Arc::new(MemoryPosts::new(sample_posts())),
	);
	let page = search
		.search(
			&Viewer::Anonymous,
			params(serde_json::json!({ "q": "hello", "search_forums": ["2"] })),
		)
		.await
		.expect("Search must succeed.");

	assert_eq!(ids(&page.results), vec![2, 5, 6]);
	assert!(page.results.iter().flatten().all(|hit| hit.forum_id == 2));
}

#[tokio::test]
async fn unreadable_scope_is_rejected() {
	let store = Arc::new(MemoryPosts::new(sample_posts()));
	let (search, _) =
		service(SearchEngine::Substring, vec![forum(1, "General", 0)], store.clone());
	let err = search
		.search(&Viewer::Anonymous, params(serde_json::json!({ "q": "hello", "search_forums": [3] })))
		.await
		.expect_err("Expected scope outside the readable forums to fail.");

	assert!(matches!(err, Error::InvalidRequest { ref fields, .. } if fields == &["search_forums".to_string()]));
	assert_eq!(store.query_count(), 0);
}

#[tokio::test]
async fn permissions_are_consulted_once_per_search() {
	let (search, calls) = service(
		SearchEngine::Substring,
		vec![forum(1, "General", 0)],
		Arc::new(MemoryPosts::new(sample_posts())),
	);

	search
		.search(&Viewer::Anonymous, params(serde_json::json!({ "q": "hello" })))
		.await
		.expect("Search must succeed.");
	search
		.search(&Viewer::Anonymous, params(serde_json::json!({ "q": "hello" })))
		.await
		.expect("Search must succeed.");

	assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn rows_outside_scope_or_limit_are_dropped() {
	let oracle = FixedForums::new(vec![forum(1, "General", 0), forum(2, "Help", 0)]);
	let cfg = Search { max_results: 1, ..search_cfg(SearchEngine::Substring) };
	let search = ForumSearch::new(cfg, Arc::new(oracle), Arc::new(LeakyPosts));
	let page = search
		.search(&Viewer::Anonymous, params(serde_json::json!({ "q": "hello" })))
		.await
		.expect("Search must succeed.");

	assert_eq!(ids(&page.results), vec![1]);
}

#[tokio::test]
async fn result_size_is_capped() {
	let posts = (1..=30)
		.map(|post_id| StoredPost {
			post_id,
			forum_id: 1,
			subject: "hello",
			content: "",
			poster: None,
			guest_name: Some("guest"),
		})
		.collect();
	let oracle = FixedForums::new(vec![forum(1, "General", 0)]);
	let cfg = Search { max_results: 25, ..search_cfg(SearchEngine::Ranked) };
	let search = ForumSearch::new(cfg, Arc::new(oracle), Arc::new(MemoryPosts::new(posts)));
	let page = search
		.search(&Viewer::Anonymous, params(serde_json::json!({ "q": "hello" })))
		.await
		.expect("Search must succeed.");

	assert_eq!(page.results.map(|hits| hits.len()), Some(25));
}

#[tokio::test]
async fn store_failures_propagate() {
	let (search, _) =
		service(SearchEngine::Ranked, vec![forum(1, "General", 0)], Arc::new(FailingPosts));
	let err = search
		.search(&Viewer::Anonymous, params(serde_json::json!({ "q": "hello" })))
		.await
		.expect_err("Expected store failure.");

	assert!(matches!(err, Error::Storage { ref message } if message == "connection reset"));
}

#[tokio::test]
async fn choices_follow_readable_forums() {
	let (search, _) = service(
		SearchEngine::Substring,
		vec![forum(1, "General", 0), forum(5, "Announcements", 1)],
		Arc::new(MemoryPosts::new(Vec::new())),
	);
	let viewer = search.resolve_viewer(Some(7)).await.expect("Viewer must resolve.");
	let choices = search.choices(&viewer).await.expect("Choices must load.");

	assert_eq!(viewer.user_id(), Some(7));
	assert_eq!(
		choices.iter().map(|choice| (choice.id, choice.label.as_str())).collect::<Vec<_>>(),
		vec![(1, " General"), (5, "- Announcements")]
	);
}
