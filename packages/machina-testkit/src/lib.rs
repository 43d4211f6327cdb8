//! Throwaway Postgres databases for integration tests that need a live server.

mod error;

pub use error::{Error, Result};

use std::{env, str::FromStr, thread};

use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use tokio::runtime::Builder;
use uuid::Uuid;

const DSN_ENV: &str = "MACHINA_PG_DSN";
const ADMIN_DATABASES: [&str; 2] = ["postgres", "template1"];

/// The server to create test databases on, if one is configured.
pub fn env_dsn() -> Option<String> {
	env::var(DSN_ENV).ok().filter(|dsn| !dsn.trim().is_empty())
}

/// A freshly created, uniquely named database. Dropped by [`TestDatabase::cleanup`], or on a
/// background thread when the value goes out of scope without it.
pub struct TestDatabase {
	name: String,
	dsn: String,
	admin: PgConnectOptions,
	dropped: bool,
}
impl TestDatabase {
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base = PgConnectOptions::from_str(base_dsn).map_err(Error::InvalidDsn)?;
		let (admin, mut conn) = admin_connection(&base).await?;
		let name = format!("machina_test_{}", Uuid::new_v4().simple());

		conn.execute(format!(r#"CREATE DATABASE "{name}""#).as_str())
			.await
			.map_err(|source| Error::Create { name: name.clone(), source })?;

		let dsn = base.database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, admin, dropped: false })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	pub async fn cleanup(mut self) -> Result<()> {
		drop_database(&self.name, &self.admin).await?;

		self.dropped = true;

		Ok(())
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.dropped {
			return;
		}

		let name = self.name.clone();
		let admin = self.admin.clone();
		// The owning runtime may be shutting down, so cleanup gets a runtime of its own.
		let handle = thread::spawn(move || {
			let outcome = Builder::new_current_thread()
				.enable_all()
				.build()
				.map_err(|err| err.to_string())
				.and_then(|runtime| {
					runtime.block_on(drop_database(&name, &admin)).map_err(|err| err.to_string())
				});

			if let Err(err) = outcome {
				eprintln!("Leaked test database {name}: {err}");
			}
		});
		let _ = handle.join();
	}
}

async fn admin_connection(base: &PgConnectOptions) -> Result<(PgConnectOptions, PgConnection)> {
	let mut last_err = None;

	for database in ADMIN_DATABASES {
		let options = base.clone().database(database);

		match PgConnection::connect_with(&options).await {
			Ok(conn) => return Ok((options, conn)),
			Err(err) => last_err = Some(err),
		}
	}

	Err(Error::AdminUnreachable(last_err.unwrap_or(sqlx::Error::PoolClosed)))
}

async fn drop_database(name: &str, admin: &PgConnectOptions) -> Result<()> {
	let drop_err = |source| Error::Drop { name: name.to_string(), source };
	let mut conn = PgConnection::connect_with(admin).await.map_err(drop_err)?;

	// Lingering pool connections would block the drop.
	sqlx::query(
		"SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = $1 AND pid <> pg_backend_pid()",
	)
	.bind(name)
	.execute(&mut conn)
	.await
	.map_err(drop_err)?;

	conn.execute(format!(r#"DROP DATABASE IF EXISTS "{name}""#).as_str()).await.map_err(drop_err)?;

	Ok(())
}
