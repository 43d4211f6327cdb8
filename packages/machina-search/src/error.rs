pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String, fields: Vec<String> },
	#[error("Unknown user: {user_id}.")]
	UnknownUser { user_id: i64 },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<machina_storage::Error> for Error {
	fn from(err: machina_storage::Error) -> Self {
		match err {
			machina_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			machina_storage::Error::InvalidArgument(message) =>
				Self::InvalidRequest { message, fields: Vec::new() },
			err @ machina_storage::Error::TextSearchConfigMismatch { .. } =>
				Self::Storage { message: err.to_string() },
		}
	}
}
