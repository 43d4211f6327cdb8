use std::collections::HashMap;

use machina_storage::{
	forums::{GRANTEE_ANONYMOUS, GRANTEE_AUTHENTICATED, GRANTEE_USER},
	models::{Forum, ForumReadGrant, ForumUser},
};

/// Who is asking. Anonymous visitors only see what anonymous grants open up.
#[derive(Debug, Clone)]
pub enum Viewer {
	Anonymous,
	User(ForumUser),
}
impl Viewer {
	pub fn user_id(&self) -> Option<i64> {
		match self {
			Self::Anonymous => None,
			Self::User(user) => Some(user.user_id),
		}
	}

	pub fn is_superuser(&self) -> bool {
		matches!(self, Self::User(user) if user.is_superuser)
	}
}

/// Filters `forums` down to the ones `viewer` may read, keeping their order.
///
/// A grant addressed to the user wins over the default grant for anonymous or authenticated
/// callers. Forums without any applicable grant are hidden, and so is every descendant of a
/// hidden forum.
pub fn readable_forums(forums: Vec<Forum>, grants: &[ForumReadGrant], viewer: &Viewer) -> Vec<Forum> {
	if viewer.is_superuser() {
		return forums;
	}

	let default_kind =
		if viewer.user_id().is_some() { GRANTEE_AUTHENTICATED } else { GRANTEE_ANONYMOUS };
	let mut default_grants = HashMap::new();
	let mut user_grants = HashMap::new();

	for grant in grants {
		if grant.grantee_kind == GRANTEE_USER {
			if grant.user_id.is_some() && grant.user_id == viewer.user_id() {
				user_grants.insert(grant.forum_id, grant.has_perm);
			}
		} else if grant.grantee_kind == default_kind {
			default_grants.insert(grant.forum_id, grant.has_perm);
		}
	}

	let own_grant = |forum_id: i64| {
		user_grants
			.get(&forum_id)
			.or_else(|| default_grants.get(&forum_id))
			.copied()
			.unwrap_or(false)
	};
	let parents: HashMap<i64, Option<i64>> =
		forums.iter().map(|forum| (forum.forum_id, forum.parent_id)).collect();
	let mut resolved: HashMap<i64, bool> = HashMap::with_capacity(forums.len());

	for forum in &forums {
		let mut chain = Vec::new();
		let mut cursor = Some(forum.forum_id);
		let mut readable = true;

		while let Some(forum_id) = cursor {
			if let Some(known) = resolved.get(&forum_id) {
				readable = *known;

				break;
			}
			// A cycle in parent links would loop forever; treat it as unreadable.
			if chain.contains(&forum_id) || chain.len() > parents.len() {
				readable = false;

				break;
			}

			chain.push(forum_id);

			cursor = parents.get(&forum_id).copied().flatten();
		}

		// Walk back down from the topmost unresolved ancestor.
		for forum_id in chain.into_iter().rev() {
			readable = readable && own_grant(forum_id);

			resolved.insert(forum_id, readable);
		}
	}

	forums.into_iter().filter(|forum| resolved.get(&forum.forum_id).copied().unwrap_or(false)).collect()
}
