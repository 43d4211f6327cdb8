mod error;
mod types;

pub use error::{Error, Result};
pub use types::{MAX_SEARCH_RESULTS, Config, Postgres, Search, SearchEngine, Service, Storage};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.search.max_results == 0 {
		return Err(Error::Validation {
			message: "search.max_results must be greater than zero.".to_string(),
		});
	}
	if cfg.search.max_results > MAX_SEARCH_RESULTS {
		return Err(Error::Validation {
			message: format!("search.max_results must be {MAX_SEARCH_RESULTS} or less."),
		});
	}
	if cfg.search.poster_name_max_chars == 0 {
		return Err(Error::Validation {
			message: "search.poster_name_max_chars must be greater than zero.".to_string(),
		});
	}

	let text_search_config = cfg.search.text_search_config.as_str();

	// The value is spliced into generated column DDL, so only plain identifiers pass.
	if text_search_config.is_empty()
		|| !text_search_config.chars().all(|c| c.is_ascii_lowercase() || c == '_')
	{
		return Err(Error::Validation {
			message: "search.text_search_config must be a lowercase identifier such as english or simple."
				.to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.service.log_level = cfg.service.log_level.trim().to_string();

	if cfg.service.log_level.is_empty() {
		cfg.service.log_level = "info".to_string();
	}

	cfg.search.text_search_config = cfg.search.text_search_config.trim().to_ascii_lowercase();
}
