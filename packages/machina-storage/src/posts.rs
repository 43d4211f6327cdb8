use sqlx::{PgExecutor, Postgres, QueryBuilder};

use crate::{Error, Result, models::PostRow};

/// Precomputed full-text vector a ranked search runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchVector {
	Subject,
	All,
}
impl SearchVector {
	pub fn column(self) -> &'static str {
		match self {
			Self::Subject => "search_vector_subject",
			Self::All => "search_vector_all",
		}
	}
}

/// Text columns a substring search looks into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFields {
	Subject,
	SubjectOrContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchMode {
	Ranked { vector: SearchVector, terms: String },
	Substring { fields: TextFields, needle: String },
}

/// A fully resolved post lookup. Every clause is conjunctive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
	pub matcher: MatchMode,
	/// Keeps posts whose registered poster name contains this value (case-insensitive) or whose
	/// guest name equals it.
	pub poster_name: Option<String>,
	pub forum_ids: Vec<i64>,
	pub limit: u32,
}

pub async fn search_posts<'e, E>(
	executor: E,
	query: &PostQuery,
	text_search_config: &str,
) -> Result<Vec<PostRow>>
where
	E: PgExecutor<'e>,
{
	if query.forum_ids.is_empty() {
		return Err(Error::InvalidArgument("forum_ids must be non-empty.".to_string()));
	}

	let mut builder = build_search_sql(query, text_search_config);
	let rows = builder.build_query_as::<PostRow>().fetch_all(executor).await?;

	Ok(rows)
}

fn build_search_sql(query: &PostQuery, text_search_config: &str) -> QueryBuilder<'static, Postgres> {
	let mut builder = QueryBuilder::new(
		"\
SELECT
	p.post_id,
	p.topic_id,
	t.forum_id,
	p.subject,
	p.content,
	p.poster_id,
	u.username AS poster_username,
	p.username,
	p.created_at,
	",
	);

	match &query.matcher {
		MatchMode::Ranked { vector, terms } => {
			builder.push("ts_rank(p.");
			builder.push(vector.column());
			builder.push(", plainto_tsquery(");
			builder.push_bind(text_search_config.to_string());
			builder.push("::regconfig, ");
			builder.push_bind(terms.clone());
			builder.push("))::REAL AS rank");
		},
		MatchMode::Substring { .. } => {
			builder.push("0::REAL AS rank");
		},
	}

	builder.push(
		"
FROM forum_posts p
JOIN forum_topics t ON t.topic_id = p.topic_id
LEFT JOIN forum_users u ON u.user_id = p.poster_id
WHERE t.forum_id = ANY(",
	);
	builder.push_bind(query.forum_ids.clone());
	builder.push(")");

	match &query.matcher {
		MatchMode::Ranked { vector, terms } => {
			builder.push(" AND p.");
			builder.push(vector.column());
			builder.push(" @@ plainto_tsquery(");
			builder.push_bind(text_search_config.to_string());
			builder.push("::regconfig, ");
			builder.push_bind(terms.clone());
			builder.push(")");
		},
		MatchMode::Substring { fields, needle } => {
			let pattern = contains_pattern(needle);

			builder.push(" AND (p.subject ILIKE ");
			builder.push_bind(pattern.clone());

			if *fields == TextFields::SubjectOrContent {
				builder.push(" OR p.content ILIKE ");
				builder.push_bind(pattern);
			}

			builder.push(")");
		},
	}

	if let Some(poster_name) = query.poster_name.as_deref() {
		builder.push(" AND (u.username ILIKE ");
		builder.push_bind(contains_pattern(poster_name));
		builder.push(" OR p.username = ");
		builder.push_bind(poster_name.to_string());
		builder.push(")");
	}

	match query.matcher {
		MatchMode::Ranked { .. } => builder.push(" ORDER BY rank DESC, p.post_id ASC"),
		MatchMode::Substring { .. } => builder.push(" ORDER BY p.created_at ASC, p.post_id ASC"),
	};

	builder.push(" LIMIT ");
	builder.push_bind(i64::from(query.limit));

	builder
}

/// `ILIKE` pattern matching `value` anywhere, with wildcard characters taken literally.
pub fn contains_pattern(value: &str) -> String {
	let mut pattern = String::with_capacity(value.len() + 2);

	pattern.push('%');

	for c in value.chars() {
		if matches!(c, '%' | '_' | '\\') {
			pattern.push('\\');
		}

		pattern.push(c);
	}

	pattern.push('%');

	pattern
}
