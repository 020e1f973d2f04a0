//! Day records (one outing over a route) and their repository.
//!
//! A day id is derived from its date and route id, with `_2`, `_3`, …
//! suffixes when several parties log the same route on the same date. Ids
//! are never reused: an explicit id that resolves to nothing gets a fresh
//! generated id instead (guarded callers reject that case earlier, see
//! [`crate::logbook::Logbook::update_day`]).

use std::sync::{Arc, Mutex};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::ActivityStats;
use crate::identity::day_id_base;
use crate::store::{load_typed, save_typed, RecordKind, RecordStore};
use crate::visibility::Visibility;

/// One dated occurrence of traveling a route.
///
/// The day references its route by id and owns its sharing metadata. The
/// optional `activity` sub-record comes strictly from the day's own
/// uploaded track, never from the route's planned track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Day {
    pub id: String,
    pub route_id: String,
    pub date: String,
    /// Empty when nobody has claimed the day yet.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub owner_id: String,
    #[serde(default)]
    pub visibility: Visibility,
    /// Meaningful when `visibility` is `groups`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_ids: Vec<String>,
    /// Meaningful when `visibility` is `people`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub people_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snow_quality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avalanches_seen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<ActivityStats>,
}

/// Caller-supplied day fields for an upsert.
///
/// An upsert overwrites the stored day with these values wholesale; callers
/// that want to keep prior values merge them into the draft first. Two
/// exceptions: `owner_id` only overwrites when non-empty, and `activity`
/// only when supplied.
#[derive(Debug, Clone, Default)]
pub struct DayDraft {
    pub id: Option<String>,
    pub route_id: String,
    pub date: String,
    pub owner_id: Option<String>,
    pub visibility: Visibility,
    pub group_ids: Vec<String>,
    pub people_ids: Vec<String>,
    pub snow_quality: Option<String>,
    pub weather: Option<String>,
    pub description: Option<String>,
    pub avalanches_seen: Option<String>,
    pub activity: Option<ActivityStats>,
}

impl DayDraft {
    pub fn new(route_id: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            route_id: route_id.into(),
            date: date.into(),
            ..Self::default()
        }
    }
}

// ============================================================================
// Repository
// ============================================================================

/// Day collection over an injected record store.
///
/// Writes take a repository-wide lock across the load-mutate-save section,
/// the same discipline as [`crate::routes::RouteRepository`].
pub struct DayRepository {
    store: Arc<dyn RecordStore>,
    write_lock: Mutex<()>,
}

impl DayRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Create or update a day.
    ///
    /// A draft whose id resolves to a stored day overwrites that day in
    /// place; anything else creates a new record under a generated id
    /// (`slug(date_routeid)`, suffixed until free). The stored owner is
    /// kept unless the draft supplies a non-empty one, and the stored
    /// activity sub-record is kept unless the draft supplies one.
    pub fn upsert(&self, draft: DayDraft) -> Result<Day> {
        if draft.route_id.is_empty() {
            return Err(Error::validation("day route_id is required"));
        }
        if draft.date.is_empty() {
            return Err(Error::validation("day date is required"));
        }

        let _guard = self.write_lock.lock().unwrap();
        let mut records = self.load_records()?;

        let existing_idx = draft
            .id
            .as_deref()
            .filter(|id| !id.is_empty())
            .and_then(|id| records.iter().position(|d| d.id == id));

        let id = match existing_idx {
            Some(idx) => records[idx].id.clone(),
            None => generate_day_id(&records, &draft.date, &draft.route_id),
        };

        let owner_id = match draft.owner_id.filter(|o| !o.is_empty()) {
            Some(owner) => owner,
            None => existing_idx
                .map(|idx| records[idx].owner_id.clone())
                .unwrap_or_default(),
        };
        let activity = draft
            .activity
            .or_else(|| existing_idx.and_then(|idx| records[idx].activity));

        let day = Day {
            id,
            route_id: draft.route_id,
            date: draft.date,
            owner_id,
            visibility: draft.visibility,
            group_ids: draft.group_ids,
            people_ids: draft.people_ids,
            snow_quality: draft.snow_quality,
            weather: draft.weather,
            description: draft.description,
            avalanches_seen: draft.avalanches_seen,
            activity,
        };

        match existing_idx {
            Some(idx) => {
                debug!("updated day '{}'", day.id);
                records[idx] = day.clone();
            }
            None => {
                debug!("created day '{}'", day.id);
                records.push(day.clone());
            }
        }

        self.save_records(&records)?;
        Ok(day)
    }

    /// Look up one day by id.
    pub fn get(&self, id: &str) -> Result<Option<Day>> {
        Ok(self.load_records()?.into_iter().find(|d| d.id == id))
    }

    /// Every stored day.
    pub fn list(&self) -> Result<Vec<Day>> {
        self.load_records()
    }

    /// Every stored day referencing a route.
    pub fn for_route(&self, route_id: &str) -> Result<Vec<Day>> {
        Ok(self
            .load_records()?
            .into_iter()
            .filter(|d| d.route_id == route_id)
            .collect())
    }

    fn load_records(&self) -> Result<Vec<Day>> {
        load_typed(self.store.as_ref(), RecordKind::Days)
    }

    fn save_records(&self, records: &[Day]) -> Result<()> {
        save_typed(self.store.as_ref(), RecordKind::Days, records)
    }
}

fn generate_day_id(records: &[Day], date: &str, route_id: &str) -> String {
    let base = day_id_base(date, route_id);
    let mut id = base.clone();
    let mut counter = 2;
    while records.iter().any(|d| d.id == id) {
        id = format!("{}_{}", base, counter);
        counter += 1;
    }
    id
}

// ============================================================================
// Tests
// ============================================================================
