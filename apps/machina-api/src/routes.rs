use axum::{
	Json, Router,
	extract::{State, rejection::JsonRejection},
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;

use machina_search::{Error, ForumChoice, SearchPage, SearchParams, Viewer};

use crate::state::AppState;

/// Header carrying the authenticated user id. Requests without it are anonymous.
pub const USER_ID_HEADER: &str = "x-forum-user-id";

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/forum/search", post(search))
		.route("/v1/forum/search/choices", get(choices))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	headers: HeaderMap,
	payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<SearchPage>, ApiError> {
	// Field types are checked by `SearchParams::from_json` so errors can name the field.
	let Json(body) = payload.map_err(|rejection| {
		json_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text(), None)
	})?;
	let viewer = viewer(&state, &headers).await?;
	let params = SearchParams::from_json(body)?;
	let page = state.search.search(&viewer, params).await?;

	Ok(Json(page))
}

#[derive(Debug, Serialize)]
struct ChoicesResponse {
	choices: Vec<ForumChoice>,
}

async fn choices(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<ChoicesResponse>, ApiError> {
	let viewer = viewer(&state, &headers).await?;
	let choices = state.search.choices(&viewer).await?;

	Ok(Json(ChoicesResponse { choices }))
}

async fn viewer(state: &AppState, headers: &HeaderMap) -> Result<Viewer, ApiError> {
	let user_id = match headers.get(USER_ID_HEADER) {
		None => None,
		Some(raw) => {
			let parsed = raw.to_str().ok().and_then(|value| value.trim().parse::<i64>().ok());

			match parsed {
				Some(user_id) => Some(user_id),
				None => {
					return Err(json_error(
						StatusCode::BAD_REQUEST,
						"invalid_request",
						format!("{USER_ID_HEADER} must be an integer user id."),
						Some(vec![USER_ID_HEADER.to_string()]),
					));
				},
			}
		},
	};

	Ok(state.search.resolve_viewer(user_id).await?)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message, fields } => json_error(
				StatusCode::BAD_REQUEST,
				"invalid_request",
				message,
				if fields.is_empty() { None } else { Some(fields) },
			),
			Error::UnknownUser { user_id } => json_error(
				StatusCode::UNAUTHORIZED,
				"unknown_user",
				format!("User {user_id} does not exist."),
				None,
			),
			Error::Storage { message } => {
				tracing::error!(error = %message, "Search failed in storage.");

				json_error(
					StatusCode::INTERNAL_SERVER_ERROR,
					"storage_error",
					"Search is temporarily unavailable.",
					None,
				)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}
