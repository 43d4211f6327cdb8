use time::OffsetDateTime;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ForumUser {
	pub user_id: i64,
	pub username: String,
	pub is_superuser: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Forum {
	pub forum_id: i64,
	pub parent_id: Option<i64>,
	pub name: String,
	/// Nesting depth in the forum tree. Root forums sit at zero.
	pub margin_level: i32,
	pub tree_position: i32,
	pub last_post_on: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ForumReadGrant {
	pub forum_id: i64,
	pub grantee_kind: String,
	pub user_id: Option<i64>,
	pub has_perm: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
	pub post_id: i64,
	pub topic_id: i64,
	pub forum_id: i64,
	pub subject: String,
	pub content: String,
	pub poster_id: Option<i64>,
	pub poster_username: Option<String>,
	/// Display name of a guest poster.
	pub username: Option<String>,
	pub created_at: OffsetDateTime,
	pub rank: f32,
}
