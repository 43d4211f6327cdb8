use serde::Deserialize;

/// Hard ceiling on the number of posts a single search may return.
pub const MAX_SEARCH_RESULTS: u32 = 20_000;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	#[serde(default)]
	pub search: Search,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Search {
	#[serde(default)]
	pub engine: SearchEngine,
	/// Postgres text search configuration used for the generated search vectors and queries.
	#[serde(default = "default_text_search_config")]
	pub text_search_config: String,
	#[serde(default = "default_max_results")]
	pub max_results: u32,
	#[serde(default = "default_poster_name_max_chars")]
	pub poster_name_max_chars: usize,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			engine: SearchEngine::default(),
			text_search_config: default_text_search_config(),
			max_results: default_max_results(),
			poster_name_max_chars: default_poster_name_max_chars(),
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchEngine {
	/// Database-native full-text search ordered by relevance.
	#[serde(alias = "postgres")]
	Ranked,
	/// Case-insensitive substring matching.
	#[default]
	Substring,
}
impl SearchEngine {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Ranked => "ranked",
			Self::Substring => "substring",
		}
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_text_search_config() -> String {
	"english".to_string()
}

fn default_max_results() -> u32 {
	MAX_SEARCH_RESULTS
}

fn default_poster_name_max_chars() -> usize {
	255
}
