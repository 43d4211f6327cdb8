pub fn render_schema(text_search_config: &str) -> String {
	let init = include_str!("../../../sql/init.sql");
	let expanded = expand_includes(init);

	expanded.replace("<TEXT_SEARCH_CONFIG>", text_search_config)
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_forum_users.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_forum_users.sql")),
				"tables/002_forums.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_forums.sql")),
				"tables/003_forum_topics.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_forum_topics.sql")),
				"tables/004_forum_posts.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_forum_posts.sql")),
				"tables/005_forum_read_grants.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_forum_read_grants.sql")),
				"tables/006_forum_data_migrations.sql" => out
					.push_str(include_str!("../../../sql/tables/006_forum_data_migrations.sql")),
				"tables/007_forum_search_settings.sql" => out
					.push_str(include_str!("../../../sql/tables/007_forum_search_settings.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}
