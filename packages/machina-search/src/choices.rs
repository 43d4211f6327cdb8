use serde::Serialize;
use time::OffsetDateTime;

use machina_storage::models::Forum;

/// A selectable search scope entry, labelled so the forum tree reads as nested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForumChoice {
	pub id: i64,
	pub label: String,
	#[serde(with = "time::serde::rfc3339::option")]
	pub last_post_on: Option<OffsetDateTime>,
}

/// Builds scope choices in the order the readable forums were returned.
///
/// An empty list means the caller cannot read any forum and the scope field should be hidden.
pub fn scope_choices(readable: &[Forum]) -> Vec<ForumChoice> {
	readable
		.iter()
		.map(|forum| ForumChoice {
			id: forum.forum_id,
			label: choice_label(forum),
			last_post_on: forum.last_post_on,
		})
		.collect()
}

fn choice_label(forum: &Forum) -> String {
	let depth = usize::try_from(forum.margin_level).unwrap_or(0);

	format!("{} {}", "-".repeat(depth), forum.name)
}
