//! Multi-mode visibility engine.
//!
//! [`is_visible`] is the single authoritative decision for "may this viewer
//! see this day". Query-time filtering ([`day_matches`]) wraps it with
//! orthogonal category and date tests and never re-encodes mode semantics.
//!
//! The engine fails closed: a stored visibility string nobody recognizes
//! makes the day invisible to everyone but its owner.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::days::Day;

/// Sharing policy attached to a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Visible to everyone, signed in or not.
    #[default]
    Public,
    /// Visible to the owner only.
    Private,
    /// Visible to accepted friends of the owner.
    Friends,
    /// Visible to the users listed on the day.
    People,
    /// Visible to members of the groups listed on the day, and to everyone
    /// when one of those groups is public.
    Groups,
    /// Catch-all for stored values written by a newer or foreign producer.
    #[serde(other)]
    Unknown,
}

// ============================================================================
// Collaborator contracts
// ============================================================================

/// Social-graph collaborator: queried as "is `other_id` in `user_id`'s
/// accepted-friends set".
pub trait SocialGraph: Send + Sync {
    fn is_friend(&self, user_id: &str, other_id: &str) -> bool;
}

/// Group-membership collaborator.
pub trait GroupDirectory: Send + Sync {
    fn is_member(&self, user_id: &str, group_id: &str) -> bool;
    fn is_public_group(&self, group_id: &str) -> bool;
}

// ============================================================================
// The decision
// ============================================================================

/// Decide whether `viewer` may see `day`.
///
/// - the owner always sees their own day, regardless of mode;
/// - `public` is visible to everyone, `private` to nobody else;
/// - `friends` needs a signed-in viewer with an accepted friendship edge
///   toward the owner;
/// - `people` needs the viewer on the day's people list;
/// - `groups` is visible when any of the day's groups is public, or the
///   viewer is a member of any of them;
/// - an unrecognized mode is visible to nobody else.
pub fn is_visible(
    day: &Day,
    viewer: Option<&str>,
    social: &dyn SocialGraph,
    groups: &dyn GroupDirectory,
) -> bool {
    if !day.owner_id.is_empty() && viewer == Some(day.owner_id.as_str()) {
        return true;
    }

    match day.visibility {
        Visibility::Public => true,
        Visibility::Private => false,
        Visibility::Friends => viewer.map_or(false, |v| social.is_friend(v, &day.owner_id)),
        Visibility::People => viewer.map_or(false, |v| day.people_ids.iter().any(|p| p == v)),
        Visibility::Groups => {
            day.group_ids.iter().any(|g| groups.is_public_group(g))
                || viewer.map_or(false, |v| day.group_ids.iter().any(|g| groups.is_member(v, g)))
        }
        Visibility::Unknown => false,
    }
}

// ============================================================================
// Query-time filtering
// ============================================================================

/// Caller-selected slice of the visible days.
#[derive(Debug, Clone, Default)]
pub enum VisibilityCategory {
    /// Every visible day.
    #[default]
    All,
    /// Visible days whose own mode is `friends`.
    Friends,
    /// Visible days whose own mode is `groups` and whose group list
    /// intersects the given subset. An empty subset matches nothing.
    Groups { group_ids: Vec<String> },
}

/// Listing filter applied per candidate day.
#[derive(Debug, Clone, Default)]
pub struct DayFilter {
    pub category: VisibilityCategory,
    /// Exact-date match; a day whose date cannot be parsed is excluded
    /// whenever this is set.
    pub date: Option<NaiveDate>,
}

/// Whether `day` passes both the visibility decision and the filter.
///
/// Category and date checks are orthogonal to visibility: a day that
/// [`is_visible`] rejects never matches, whatever the filter says.
pub fn day_matches(
    day: &Day,
    viewer: Option<&str>,
    filter: &DayFilter,
    social: &dyn SocialGraph,
    groups: &dyn GroupDirectory,
) -> bool {
    if !is_visible(day, viewer, social, groups) {
        return false;
    }

    match &filter.category {
        VisibilityCategory::All => {}
        VisibilityCategory::Friends => {
            if day.visibility != Visibility::Friends {
                return false;
            }
        }
        VisibilityCategory::Groups { group_ids } => {
            if day.visibility != Visibility::Groups {
                return false;
            }
            if !day.group_ids.iter().any(|g| group_ids.contains(g)) {
                return false;
            }
        }
    }

    if let Some(wanted) = filter.date {
        match parse_day_date(&day.date) {
            Some(date) if date == wanted => {}
            _ => return false,
        }
    }

    true
}

/// Lenient day-date parser: ISO `YYYY-MM-DD` (extra characters after the
/// date are ignored), falling back to the first 8 digits read as
/// `DDMMYYYY`.
pub fn parse_day_date(value: &str) -> Option<NaiveDate> {
    let head: String = value.chars().take(10).collect();
    if let Ok(date) = NaiveDate::parse_from_str(&head, "%Y-%m-%d") {
        return Some(date);
    }

    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() >= 8 {
        if let Ok(date) = NaiveDate::parse_from_str(&digits[..8], "%d%m%Y") {
            return Some(date);
        }
    }

    None
}

// ============================================================================
// Tests
// ============================================================================
