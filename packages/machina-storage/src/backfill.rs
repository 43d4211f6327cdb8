//! One-off data fixes that run during schema bootstrap.

use sqlx::{PgConnection, PgExecutor};

use crate::Result;

/// Name recorded in `forum_data_migrations` once the last post backfill has run.
pub const FORUM_LAST_POST_ON: &str = "0007_forum_last_post_on";

/// Sets every forum's `last_post_on` to the latest activity among its approved topics, or NULL
/// when it has none. Returns the number of forums touched.
pub async fn backfill_forum_last_post_on<'e, E>(executor: E) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE forums f
SET last_post_on = (
	SELECT max(t.last_post_on)
	FROM forum_topics t
	WHERE t.forum_id = f.forum_id
		AND t.approved
)",
	)
	.execute(executor)
	.await?;

	Ok(result.rows_affected())
}

pub(crate) async fn is_applied(conn: &mut PgConnection, name: &str) -> Result<bool> {
	let applied: bool =
		sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM forum_data_migrations WHERE name = $1)")
			.bind(name)
			.fetch_one(conn)
			.await?;

	Ok(applied)
}

pub(crate) async fn mark_applied(conn: &mut PgConnection, name: &str) -> Result<()> {
	sqlx::query("INSERT INTO forum_data_migrations (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
		.bind(name)
		.execute(conn)
		.await?;

	Ok(())
}
