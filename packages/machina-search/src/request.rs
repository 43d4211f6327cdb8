use std::collections::BTreeSet;

use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{AllowedForumSet, Error, Result};

/// Raw search parameters as submitted by a client, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
	#[serde(default)]
	pub q: Option<String>,
	#[serde(default)]
	pub search_topics: Option<FormBool>,
	#[serde(default)]
	pub search_poster_name: Option<String>,
	#[serde(default)]
	pub search_forums: Option<Vec<FormValue>>,
}

impl SearchParams {
	/// Decodes a JSON request body one field at a time, so a value of the wrong type is reported
	/// against the field it was submitted for. Unknown keys are ignored.
	pub fn from_json(body: Value) -> Result<Self> {
		let Value::Object(mut body) = body else {
			return Err(Error::InvalidRequest {
				message: "Request body must be a JSON object.".to_string(),
				fields: Vec::new(),
			});
		};
		let mut errors = Vec::new();
		let q = decode_field(&mut body, "q", &mut errors);
		let search_topics = decode_field(&mut body, "search_topics", &mut errors);
		let search_poster_name = decode_field(&mut body, "search_poster_name", &mut errors);
		let search_forums = match body.remove("search_forums") {
			None | Some(Value::Null) => None,
			Some(Value::Array(values)) =>
				decode_value(Value::Array(values), "search_forums", &mut errors),
			Some(_) => {
				errors.push(FieldError::new("search_forums", "Enter a list of values.".to_string()));

				None
			},
		};

		if !errors.is_empty() {
			return Err(invalid_request(errors));
		}

		Ok(Self { q, search_topics, search_poster_name, search_forums })
	}
}

/// Checkbox value: a JSON boolean or number, or the string a browser form submits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FormBool {
	Bool(bool),
	Int(i64),
	Text(String),
}
impl FormBool {
	/// Only `false`, `0` (case-insensitive) and empty values are unchecked.
	pub fn is_checked(&self) -> bool {
		match self {
			Self::Bool(value) => *value,
			Self::Int(value) => *value != 0,
			Self::Text(raw) =>
				!(raw.is_empty() || raw.eq_ignore_ascii_case("false") || raw == "0"),
		}
	}
}

/// Choice value: forum ids arrive as numbers from JSON clients and as strings from forms.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
	Int(i64),
	Text(String),
}
impl FormValue {
	fn as_forum_id(&self) -> Option<i64> {
		match self {
			Self::Int(value) => Some(*value),
			Self::Text(raw) => raw.trim().parse().ok(),
		}
	}

	fn display(&self) -> String {
		match self {
			Self::Int(value) => value.to_string(),
			Self::Text(raw) => raw.clone(),
		}
	}
}

/// A validated search request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
	pub query: Option<String>,
	pub search_topics_only: bool,
	pub poster_name_filter: Option<String>,
	pub forum_scope: BTreeSet<i64>,
}

impl SearchParams {
	/// Validates the parameters against the forums the caller may read.
	///
	/// Forum choices outside `allowed` are rejected. When `allowed` is empty the scope field is
	/// not offered at all, so whatever was submitted for it is ignored.
	pub fn validate(
		self,
		allowed: &AllowedForumSet,
		poster_name_max_chars: usize,
	) -> Result<SearchRequest> {
		let mut errors = Vec::new();
		let query = non_empty_trimmed(self.q);
		let search_topics_only =
			self.search_topics.as_ref().map(FormBool::is_checked).unwrap_or(false);
		let poster_name_filter = non_empty_trimmed(self.search_poster_name);

		if let Some(name) = poster_name_filter.as_deref()
			&& name.chars().count() > poster_name_max_chars
		{
			errors.push(FieldError::new(
				"search_poster_name",
				format!("Ensure this value has at most {poster_name_max_chars} characters."),
			));
		}

		let mut forum_scope = BTreeSet::new();

		if !allowed.is_empty() {
			for value in self.search_forums.unwrap_or_default() {
				match value.as_forum_id() {
					Some(forum_id) if allowed.contains(forum_id) => {
						forum_scope.insert(forum_id);
					},
					_ => errors.push(FieldError::new(
						"search_forums",
						format!(
							"Select a valid choice. {} is not one of the available choices.",
							value.display()
						),
					)),
				}
			}
		}

		if !errors.is_empty() {
			return Err(invalid_request(errors));
		}

		Ok(SearchRequest { query, search_topics_only, poster_name_filter, forum_scope })
	}
}

struct FieldError {
	field: String,
	message: String,
}
impl FieldError {
	fn new(field: &str, message: String) -> Self {
		Self { field: field.to_string(), message }
	}
}

fn invalid_request(errors: Vec<FieldError>) -> Error {
	let message = errors
		.iter()
		.map(|err| format!("{}: {}", err.field, err.message))
		.collect::<Vec<_>>()
		.join(" ");
	let mut fields: Vec<String> = errors.into_iter().map(|err| err.field).collect();

	fields.dedup();

	Error::InvalidRequest { message, fields }
}

fn decode_field<T>(
	body: &mut Map<String, Value>,
	field: &str,
	errors: &mut Vec<FieldError>,
) -> Option<T>
where
	T: DeserializeOwned,
{
	match body.remove(field) {
		None | Some(Value::Null) => None,
		Some(value) => decode_value(value, field, errors),
	}
}

fn decode_value<T>(value: Value, field: &str, errors: &mut Vec<FieldError>) -> Option<T>
where
	T: DeserializeOwned,
{
	match serde_json::from_value(value) {
		Ok(decoded) => Some(decoded),
		Err(_) => {
			errors.push(FieldError::new(field, "Enter a valid value.".to_string()));

			None
		},
	}
}

fn non_empty_trimmed(value: Option<String>) -> Option<String> {
	value.map(|raw| raw.trim().to_string()).filter(|trimmed| !trimmed.is_empty())
}
