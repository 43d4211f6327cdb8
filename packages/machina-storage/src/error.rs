#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error(
		"Search vectors were generated with text search config {stored:?}, but {configured:?} is configured."
	)]
	TextSearchConfigMismatch { stored: String, configured: String },
}
