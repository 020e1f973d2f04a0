//! Friendships, groups and memberships over the record store.
//!
//! [`CommunityStore`] is the bundled implementation of the two social
//! collaborator contracts the visibility engine consumes
//! ([`SocialGraph`], [`GroupDirectory`]). Who the users *are* is someone
//! else's problem: user ids arrive as opaque strings, and there is no
//! account or credential handling here.
//!
//! Relationships are never pruned. A day that references a deleted or
//! emptied group simply stops matching at evaluation time.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identity::slugify;
use crate::store::{load_typed, save_typed, RecordKind, RecordStore};
use crate::visibility::{GroupDirectory, SocialGraph};

/// One direction of an accepted friendship. Edges are written
/// symmetrically, so a stored pair always has a mirror row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Friendship {
    pub id: String,
    pub user_id: String,
    pub friend_id: String,
    pub status: String,
}

/// A named circle of users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    pub owner_id: String,
    pub created_at: String,
}

/// A user's membership in a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    pub id: String,
    pub group_id: String,
    pub user_id: String,
    pub role: String,
}

const STATUS_ACCEPTED: &str = "accepted";
const ROLE_OWNER: &str = "owner";
const ROLE_MEMBER: &str = "member";

// ============================================================================
// Store
// ============================================================================

/// Social records over an injected record store.
pub struct CommunityStore {
    store: Arc<dyn RecordStore>,
    write_lock: Mutex<()>,
}

impl CommunityStore {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Record an accepted friendship between two users.
    ///
    /// The edge is written in both directions and the call is idempotent
    /// per direction, so repairing a half-written pair just works.
    pub fn add_friend(&self, user_id: &str, friend_id: &str) -> Result<()> {
        if user_id.is_empty() || friend_id.is_empty() {
            return Err(Error::validation("both user ids are required"));
        }
        if user_id == friend_id {
            return Err(Error::validation("cannot befriend yourself"));
        }

        let _guard = self.write_lock.lock().unwrap();
        let mut edges: Vec<Friendship> = load_typed(self.store.as_ref(), RecordKind::Friendships)?;

        let mut changed = false;
        for (from, to) in [(user_id, friend_id), (friend_id, user_id)] {
            if !edges.iter().any(|e| e.user_id == from && e.friend_id == to) {
                edges.push(Friendship {
                    id: format!("{}:{}", from, to),
                    user_id: from.to_string(),
                    friend_id: to.to_string(),
                    status: STATUS_ACCEPTED.to_string(),
                });
                changed = true;
            }
        }

        if changed {
            save_typed(self.store.as_ref(), RecordKind::Friendships, &edges)?;
        }
        Ok(())
    }

    /// Accepted friends of a user.
    pub fn friends_of(&self, user_id: &str) -> Result<Vec<String>> {
        let edges: Vec<Friendship> = load_typed(self.store.as_ref(), RecordKind::Friendships)?;
        Ok(edges
            .into_iter()
            .filter(|e| e.user_id == user_id && e.status == STATUS_ACCEPTED)
            .map(|e| e.friend_id)
            .collect())
    }

    /// Create a group and enroll its owner.
    pub fn create_group(
        &self,
        name: &str,
        owner_id: &str,
        description: Option<String>,
        is_public: bool,
    ) -> Result<Group> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("group name is required"));
        }
        if owner_id.is_empty() {
            return Err(Error::validation("group owner is required"));
        }

        let _guard = self.write_lock.lock().unwrap();
        let mut groups: Vec<Group> = load_typed(self.store.as_ref(), RecordKind::Groups)?;

        let group = Group {
            id: generate_group_id(&groups, name),
            name: name.to_string(),
            description,
            is_public,
            owner_id: owner_id.to_string(),
            created_at: Utc::now().to_rfc3339(),
        };
        groups.push(group.clone());
        save_typed(self.store.as_ref(), RecordKind::Groups, &groups)?;

        let mut memberships: Vec<Membership> =
            load_typed(self.store.as_ref(), RecordKind::Memberships)?;
        memberships.push(Membership {
            id: format!("{}:{}", group.id, owner_id),
            group_id: group.id.clone(),
            user_id: owner_id.to_string(),
            role: ROLE_OWNER.to_string(),
        });
        save_typed(self.store.as_ref(), RecordKind::Memberships, &memberships)?;

        Ok(group)
    }

    /// Enroll a user in an existing group. Idempotent: enrolling a current
    /// member returns the stored membership unchanged.
    pub fn add_member(&self, group_id: &str, user_id: &str) -> Result<Membership> {
        if user_id.is_empty() {
            return Err(Error::validation("member user id is required"));
        }

        let _guard = self.write_lock.lock().unwrap();
        let groups: Vec<Group> = load_typed(self.store.as_ref(), RecordKind::Groups)?;
        if !groups.iter().any(|g| g.id == group_id) {
            return Err(Error::not_found("group", group_id));
        }

        let mut memberships: Vec<Membership> =
            load_typed(self.store.as_ref(), RecordKind::Memberships)?;
        if let Some(existing) = memberships
            .iter()
            .find(|m| m.group_id == group_id && m.user_id == user_id)
        {
            return Ok(existing.clone());
        }

        let membership = Membership {
            id: format!("{}:{}", group_id, user_id),
            group_id: group_id.to_string(),
            user_id: user_id.to_string(),
            role: ROLE_MEMBER.to_string(),
        };
        memberships.push(membership.clone());
        save_typed(self.store.as_ref(), RecordKind::Memberships, &memberships)?;
        Ok(membership)
    }

    /// Look up one group by id.
    pub fn get_group(&self, group_id: &str) -> Result<Option<Group>> {
        let groups: Vec<Group> = load_typed(self.store.as_ref(), RecordKind::Groups)?;
        Ok(groups.into_iter().find(|g| g.id == group_id))
    }

    /// Every group the user belongs to, in stored order.
    pub fn groups_for(&self, user_id: &str) -> Result<Vec<Group>> {
        let memberships: Vec<Membership> =
            load_typed(self.store.as_ref(), RecordKind::Memberships)?;
        let groups: Vec<Group> = load_typed(self.store.as_ref(), RecordKind::Groups)?;

        Ok(groups
            .into_iter()
            .filter(|g| {
                memberships
                    .iter()
                    .any(|m| m.user_id == user_id && m.group_id == g.id)
            })
            .collect())
    }
}

/// Group ids reuse the route/day recipe: a slug of the name, suffixed
/// until free.
fn generate_group_id(groups: &[Group], name: &str) -> String {
    let base = slugify(name);
    let mut id = base.clone();
    let mut counter = 2;
    while groups.iter().any(|g| g.id == id) {
        id = format!("{}_{}", base, counter);
        counter += 1;
    }
    id
}

// ============================================================================
// Collaborator contract impls
// ============================================================================

impl SocialGraph for CommunityStore {
    fn is_friend(&self, user_id: &str, other_id: &str) -> bool {
        let edges: Vec<Friendship> =
            match load_typed(self.store.as_ref(), RecordKind::Friendships) {
                Ok(edges) => edges,
                Err(e) => {
                    warn!("friendship lookup failed, answering not-friends: {}", e);
                    return false;
                }
            };
        edges.iter().any(|e| {
            e.user_id == user_id && e.friend_id == other_id && e.status == STATUS_ACCEPTED
        })
    }
}

impl GroupDirectory for CommunityStore {
    fn is_member(&self, user_id: &str, group_id: &str) -> bool {
        let memberships: Vec<Membership> =
            match load_typed(self.store.as_ref(), RecordKind::Memberships) {
                Ok(memberships) => memberships,
                Err(e) => {
                    warn!("membership lookup failed, answering not-member: {}", e);
                    return false;
                }
            };
        memberships
            .iter()
            .any(|m| m.user_id == user_id && m.group_id == group_id)
    }

    fn is_public_group(&self, group_id: &str) -> bool {
        match self.get_group(group_id) {
            Ok(Some(group)) => group.is_public,
            Ok(None) => false,
            Err(e) => {
                warn!("group lookup failed, answering not-public: {}", e);
                false
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn community() -> CommunityStore {
        CommunityStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_friendship_is_symmetric_and_idempotent() {
        let community = community();
        community.add_friend("ana", "beto").unwrap();
        community.add_friend("ana", "beto").unwrap();
        community.add_friend("beto", "ana").unwrap();

        assert!(community.is_friend("ana", "beto"));
        assert!(community.is_friend("beto", "ana"));
        assert!(!community.is_friend("ana", "caro"));

        assert_eq!(community.friends_of("ana").unwrap(), vec!["beto"]);
        assert_eq!(community.friends_of("beto").unwrap(), vec!["ana"]);
    }

    #[test]
    fn test_add_friend_validation() {
        let community = community();
        assert!(matches!(
            community.add_friend("ana", "ana"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            community.add_friend("", "beto"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_create_group_enrolls_owner() {
        let community = community();
        let group = community
            .create_group("Powder Hounds", "ana", None, false)
            .unwrap();

        assert_eq!(group.id, "powder-hounds");
        assert_eq!(group.owner_id, "ana");
        assert!(community.is_member("ana", "powder-hounds"));
        assert!(!community.is_public_group("powder-hounds"));

        let groups = community.groups_for("ana").unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, group.id);
    }

    #[test]
    fn test_group_id_disambiguation() {
        let community = community();
        let first = community.create_group("Powder", "ana", None, false).unwrap();
        let second = community.create_group("Powder", "beto", None, false).unwrap();

        assert_eq!(first.id, "powder");
        assert_eq!(second.id, "powder_2");
    }

    #[test]
    fn test_add_member_is_idempotent_and_checked() {
        let community = community();
        community
            .create_group("Splitboarders", "ana", None, true)
            .unwrap();

        let added = community.add_member("splitboarders", "beto").unwrap();
        assert_eq!(added.role, "member");

        let again = community.add_member("splitboarders", "beto").unwrap();
        assert_eq!(again, added);

        assert!(matches!(
            community.add_member("no-such-group", "beto"),
            Err(Error::NotFound { .. })
        ));
        assert!(community.is_public_group("splitboarders"));
        assert!(community.is_member("beto", "splitboarders"));
        assert!(!community.is_member("caro", "splitboarders"));
    }
}
