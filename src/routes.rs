//! Route records and their repository.
//!
//! A route's id is derived from its name and track fingerprint at creation
//! time and never rewritten afterward: updating a stored route keeps its id
//! even when the name changes. Supplying a *different* track under an
//! explicit id forks a new route instead of overwriting the old ground
//! truth (see [`RouteRepository::upsert`]).

use std::sync::{Arc, Mutex};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::planned_stats;
use crate::identity::{route_identity, track_fingerprint};
use crate::store::{load_typed, save_typed, RecordKind, RecordStore};
use crate::TrackPoint;

/// A named path, optionally with a recorded GPS track and derived stats.
///
/// Invariant: whenever `track` is non-empty, `track_hash`, `distance_km`,
/// `gain_m` and the last-point `lat`/`lon` are consistent with it. They are
/// recomputed on every track replacement and never edited independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Route {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub track: Vec<TrackPoint>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub track_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gain_m: Option<i64>,
    /// Last track point, kept for map pins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

/// Caller-supplied route fields for an upsert.
///
/// `None` means "leave as is" for `description` and `difficulty`, and
/// "no new track" for `track`. An empty track counts as no new track.
#[derive(Debug, Clone, Default)]
pub struct RouteDraft {
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub difficulty: Option<String>,
    pub track: Option<Vec<TrackPoint>>,
}

impl RouteDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Listing filter for routes. Absent stats are conservative: a route with
/// no known distance fails any distance bound, same for gain.
#[derive(Debug, Clone, Default)]
pub struct RouteFilter {
    /// Case-insensitive substring match on the difficulty tag.
    pub difficulty: Option<String>,
    pub min_distance_km: Option<f64>,
    pub max_distance_km: Option<f64>,
    pub min_gain_m: Option<i64>,
    pub max_gain_m: Option<i64>,
}

impl RouteFilter {
    pub fn matches(&self, route: &Route) -> bool {
        if let Some(wanted) = &self.difficulty {
            let have = route.difficulty.as_deref().unwrap_or("").to_lowercase();
            if !have.contains(&wanted.to_lowercase()) {
                return false;
            }
        }

        if self.min_distance_km.is_some() || self.max_distance_km.is_some() {
            match route.distance_km {
                Some(d) => {
                    if self.min_distance_km.map_or(false, |min| d < min) {
                        return false;
                    }
                    if self.max_distance_km.map_or(false, |max| d > max) {
                        return false;
                    }
                }
                None => return false,
            }
        }

        if self.min_gain_m.is_some() || self.max_gain_m.is_some() {
            match route.gain_m {
                Some(g) => {
                    if self.min_gain_m.map_or(false, |min| g < min) {
                        return false;
                    }
                    if self.max_gain_m.map_or(false, |max| g > max) {
                        return false;
                    }
                }
                None => return false,
            }
        }

        true
    }
}

// ============================================================================
// Repository
// ============================================================================

/// Route collection over an injected record store.
///
/// Writes take a repository-wide lock across the load-mutate-save section;
/// the store replaces the whole collection per save, so anything finer
/// would still lose concurrent updates.
pub struct RouteRepository {
    store: Arc<dyn RecordStore>,
    write_lock: Mutex<()>,
}

impl RouteRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Create or update a route.
    ///
    /// Resolution order:
    /// 1. An explicit `draft.id` that resolves to a stored route wins,
    ///    unless the draft also carries a non-empty track whose fingerprint
    ///    differs from the stored non-empty one. That mismatch **forks**:
    ///    the explicit id is discarded and the draft proceeds as if none
    ///    was given, leaving the stored route untouched.
    /// 2. Otherwise the identity recomputed from `(name, track)` is looked
    ///    up in the same collection.
    /// 3. A resolved route is updated in place: the name always, the
    ///    description and difficulty only when supplied, and a non-empty
    ///    track wholesale with its derived stats.
    /// 4. Nothing resolved creates a new route, which requires a track.
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use tourlog::{MemoryStore, RouteDraft, RouteRepository, TrackPoint};
    ///
    /// let routes = RouteRepository::new(Arc::new(MemoryStore::new()));
    /// let route = routes
    ///     .upsert(RouteDraft {
    ///         name: "Test".to_string(),
    ///         track: Some(vec![
    ///             TrackPoint::with_ele(46.0, 7.0, 1000.0),
    ///             TrackPoint::with_ele(46.01, 7.0, 1500.0),
    ///         ]),
    ///         ..RouteDraft::default()
    ///     })
    ///     .unwrap();
    ///
    /// assert_eq!(route.distance_km, Some(1.11));
    /// assert_eq!(route.gain_m, Some(500));
    /// ```
    pub fn upsert(&self, draft: RouteDraft) -> Result<Route> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(Error::validation("route name is required"));
        }

        let new_track = draft.track.as_deref().unwrap_or(&[]);
        let has_new_track = !new_track.is_empty();
        let new_hash = track_fingerprint(new_track);

        let _guard = self.write_lock.lock().unwrap();
        let mut records = self.load_records()?;

        let mut target = None;
        if let Some(id) = draft.id.as_deref().filter(|id| !id.is_empty()) {
            if let Some(idx) = records.iter().position(|r| r.id == id) {
                let stored = &records[idx];
                let forked = !stored.track_hash.is_empty()
                    && !new_hash.is_empty()
                    && new_hash != stored.track_hash;
                if forked {
                    info!(
                        "track fingerprint changed under route '{}', forking a new route",
                        stored.id
                    );
                } else {
                    target = Some(idx);
                }
            }
        }

        if target.is_none() {
            let identity = route_identity(name, new_track);
            target = records.iter().position(|r| r.id == identity);
        }

        let route = match target {
            Some(idx) => {
                let route = &mut records[idx];
                route.name = name.to_string();
                if draft.description.is_some() {
                    route.description = draft.description;
                }
                if draft.difficulty.is_some() {
                    route.difficulty = draft.difficulty;
                }
                if has_new_track {
                    route.track = new_track.to_vec();
                    route.track_hash = new_hash;
                    let stats = planned_stats(&route.track);
                    route.distance_km = stats.distance_km;
                    route.gain_m = stats.gain_m;
                    let last = route.track.last();
                    route.lat = last.map(|p| p.lat);
                    route.lon = last.map(|p| p.lon);
                }
                debug!("updated route '{}'", route.id);
                route.clone()
            }
            None => {
                if !has_new_track {
                    return Err(Error::validation("a track is required for a new route"));
                }
                let stats = planned_stats(new_track);
                let last = new_track.last();
                let route = Route {
                    id: route_identity(name, new_track),
                    name: name.to_string(),
                    description: draft.description,
                    difficulty: draft.difficulty,
                    track: new_track.to_vec(),
                    track_hash: new_hash,
                    distance_km: stats.distance_km,
                    gain_m: stats.gain_m,
                    lat: last.map(|p| p.lat),
                    lon: last.map(|p| p.lon),
                };
                debug!("created route '{}'", route.id);
                records.push(route.clone());
                route
            }
        };

        self.save_records(&records)?;
        Ok(route)
    }

    /// Look up one route by id.
    pub fn get(&self, id: &str) -> Result<Option<Route>> {
        Ok(self.load_records()?.into_iter().find(|r| r.id == id))
    }

    /// Every stored route.
    pub fn list(&self) -> Result<Vec<Route>> {
        self.load_records()
    }

    fn load_records(&self) -> Result<Vec<Route>> {
        load_typed(self.store.as_ref(), RecordKind::Routes)
    }

    fn save_records(&self, records: &[Route]) -> Result<()> {
        save_typed(self.store.as_ref(), RecordKind::Routes, records)
    }
}

// ============================================================================
// Tests
// ============================================================================
