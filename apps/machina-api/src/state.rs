use std::sync::Arc;

use machina_search::ForumSearch;
use machina_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub search: Arc<ForumSearch>,
}
impl AppState {
	pub fn new(search: ForumSearch) -> Self {
		Self { search: Arc::new(search) }
	}

	pub async fn connect(config: machina_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema(&config.search.text_search_config).await?;

		Ok(Self::new(ForumSearch::postgres(config.search, db.pool)))
	}
}
