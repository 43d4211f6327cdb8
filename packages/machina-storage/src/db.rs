use sqlx::{PgConnection, PgPool, postgres::PgPoolOptions};

use crate::{Error, Result, backfill, schema};

pub struct Db {
	pub pool: PgPool,
}
impl Db {
	pub async fn connect(cfg: &machina_config::Postgres) -> Result<Self> {
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect(&cfg.dsn).await?;

		Ok(Self { pool })
	}

	pub async fn ensure_schema(&self, text_search_config: &str) -> Result<()> {
		let sql = schema::render_schema(text_search_config);
		let lock_id: i64 = 4_120_517;
		// Advisory locks are held per connection. Use a single transaction so the lock is scoped to
		// one connection and automatically released when the transaction ends.
		let mut tx = self.pool.begin().await?;

		sqlx::query("SELECT pg_advisory_xact_lock($1)").bind(lock_id).execute(&mut *tx).await?;

		for statement in sql.split(';') {
			let trimmed = statement.trim();

			if trimmed.is_empty() {
				continue;
			}

			sqlx::query(trimmed).execute(&mut *tx).await?;
		}

		check_text_search_config(&mut tx, text_search_config).await?;

		if !backfill::is_applied(&mut tx, backfill::FORUM_LAST_POST_ON).await? {
			let updated = backfill::backfill_forum_last_post_on(&mut *tx).await?;

			backfill::mark_applied(&mut tx, backfill::FORUM_LAST_POST_ON).await?;

			tracing::info!(
				migration = backfill::FORUM_LAST_POST_ON,
				forums = updated,
				"Applied forum data migration."
			);
		}

		tx.commit().await?;

		Ok(())
	}

	/// Reruns the last post backfill regardless of whether bootstrap already applied it.
	pub async fn backfill_forum_last_post_on(&self) -> Result<u64> {
		let mut tx = self.pool.begin().await?;
		let updated = backfill::backfill_forum_last_post_on(&mut *tx).await?;

		backfill::mark_applied(&mut tx, backfill::FORUM_LAST_POST_ON).await?;
		tx.commit().await?;

		Ok(updated)
	}
}

/// The generated search vectors keep the config they were created with, so a bootstrap with a
/// different one must fail instead of querying with mismatched stemming.
async fn check_text_search_config(conn: &mut PgConnection, configured: &str) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO forum_search_settings (name, value)
VALUES ('text_search_config', $1)
ON CONFLICT (name) DO NOTHING",
	)
	.bind(configured)
	.execute(&mut *conn)
	.await?;

	let stored: String = sqlx::query_scalar(
		"SELECT value FROM forum_search_settings WHERE name = 'text_search_config'",
	)
	.fetch_one(&mut *conn)
	.await?;

	if stored != configured {
		return Err(Error::TextSearchConfigMismatch {
			stored,
			configured: configured.to_string(),
		});
	}

	Ok(())
}
