use std::path::PathBuf;

use clap::{Parser, Subcommand};

use machina_storage::{backfill, db::Db};

#[derive(Debug, Parser)]
#[command(
	version = machina_cli::VERSION,
	rename_all = "kebab",
	styles = machina_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Create missing tables and indexes, then apply pending data migrations.
	Migrate,
	/// Recompute every forum's last post timestamp from its approved topics.
	BackfillLastPost,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = machina_config::load(&args.config)?;

	machina_cli::init_tracing(&config.service.log_level);

	let db = Db::connect(&config.storage.postgres).await?;

	match args.command {
		Command::Migrate => {
			db.ensure_schema(&config.search.text_search_config).await?;

			tracing::info!("Schema is up to date.");
		},
		Command::BackfillLastPost => {
			db.ensure_schema(&config.search.text_search_config).await?;

			let updated = db.backfill_forum_last_post_on().await?;

			tracing::info!(
				migration = backfill::FORUM_LAST_POST_ON,
				forums = updated,
				"Forum last post timestamps recomputed."
			);
		},
	}

	Ok(())
}
