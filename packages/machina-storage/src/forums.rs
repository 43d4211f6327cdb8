use sqlx::PgExecutor;

use crate::{
	Result,
	models::{Forum, ForumReadGrant, ForumUser},
};

pub const GRANTEE_ANONYMOUS: &str = "anonymous";
pub const GRANTEE_AUTHENTICATED: &str = "authenticated";
pub const GRANTEE_USER: &str = "user";

pub async fn find_user<'e, E>(executor: E, user_id: i64) -> Result<Option<ForumUser>>
where
	E: PgExecutor<'e>,
{
	let user = sqlx::query_as::<_, ForumUser>(
		"SELECT user_id, username, is_superuser FROM forum_users WHERE user_id = $1",
	)
	.bind(user_id)
	.fetch_optional(executor)
	.await?;

	Ok(user)
}

/// Every forum in tree order, parents before their children.
pub async fn list_forums<'e, E>(executor: E) -> Result<Vec<Forum>>
where
	E: PgExecutor<'e>,
{
	let forums = sqlx::query_as::<_, Forum>(
		"\
SELECT forum_id, parent_id, name, margin_level, tree_position, last_post_on
FROM forums
ORDER BY tree_position ASC, forum_id ASC",
	)
	.fetch_all(executor)
	.await?;

	Ok(forums)
}

/// Read grants relevant to one caller: the default grant for the caller's kind plus any grant
/// addressed to the user directly.
pub async fn load_read_grants<'e, E>(executor: E, user_id: Option<i64>) -> Result<Vec<ForumReadGrant>>
where
	E: PgExecutor<'e>,
{
	let default_kind = if user_id.is_some() { GRANTEE_AUTHENTICATED } else { GRANTEE_ANONYMOUS };
	let grants = sqlx::query_as::<_, ForumReadGrant>(
		"\
SELECT forum_id, grantee_kind, user_id, has_perm
FROM forum_read_grants
WHERE grantee_kind = $1
	OR (grantee_kind = 'user' AND user_id = $2)",
	)
	.bind(default_kind)
	.bind(user_id)
	.fetch_all(executor)
	.await?;

	Ok(grants)
}
