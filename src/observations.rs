//! Avalanche observation log.
//!
//! Observations are geolocated sightings reported by users and vouched
//! for by others. Reporting auto-confirms, so a fresh observation
//! always carries one confirmation, and a user can confirm any given
//! observation at most once.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::store::{load_typed, save_typed, RecordKind, RecordStore};

/// A reported avalanche sighting.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Observation {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lon: f64,
    /// Report time, ISO-8601 UTC
    #[serde(default)]
    pub timestamp: String,
    /// Number of users vouching for the sighting, reporter included
    #[serde(default)]
    pub confirmations: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub confirmation_user_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Avalanche size class, free text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Danger rating, 1 to 5
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub danger: Option<u8>,
    /// Estimated slope angle in degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slope: Option<f64>,
    /// Photo filename reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Input for reporting a sighting. Id and timestamp are assigned on
/// report.
#[derive(Debug, Clone, Default)]
pub struct ObservationDraft {
    pub lat: f64,
    pub lon: f64,
    pub created_by: Option<String>,
    pub description: Option<String>,
    pub size: Option<String>,
    pub danger: Option<u8>,
    pub slope: Option<f64>,
    pub image: Option<String>,
}

impl ObservationDraft {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            ..Default::default()
        }
    }
}

/// Outcome of a confirmation attempt.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub observation: Observation,
    /// True when the user had already confirmed and nothing changed
    pub already_confirmed: bool,
}

/// Observation log over a record store.
pub struct ObservationLog {
    store: Arc<dyn RecordStore>,
    write_lock: Mutex<()>,
}

impl ObservationLog {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Record a new sighting. The reporter counts as the first
    /// confirmation.
    pub fn report(&self, draft: ObservationDraft) -> Result<Observation> {
        if let Some(danger) = draft.danger {
            if !(1..=5).contains(&danger) {
                return Err(Error::validation("avalanche danger must be between 1 and 5"));
            }
        }

        let _guard = self.write_lock.lock().unwrap();
        let mut observations: Vec<Observation> =
            load_typed(self.store.as_ref(), RecordKind::Observations)?;

        let id = observations.iter().map(|o| o.id).max().unwrap_or(0) + 1;
        let confirmation_user_ids: Vec<String> = draft.created_by.iter().cloned().collect();
        let observation = Observation {
            id,
            lat: draft.lat,
            lon: draft.lon,
            timestamp: Utc::now().to_rfc3339(),
            confirmations: 1,
            confirmation_user_ids,
            created_by: draft.created_by,
            description: draft.description,
            size: draft.size,
            danger: draft.danger,
            slope: draft.slope,
            image: draft.image,
        };
        info!(
            "recorded avalanche observation {} at ({:.5}, {:.5})",
            observation.id, observation.lat, observation.lon
        );

        observations.push(observation.clone());
        save_typed(self.store.as_ref(), RecordKind::Observations, &observations)?;
        Ok(observation)
    }

    /// Vouch for an existing sighting. Confirming twice is a no-op
    /// reported through [`Confirmation::already_confirmed`].
    pub fn confirm(&self, observation_id: u64, user_id: &str) -> Result<Confirmation> {
        if user_id.trim().is_empty() {
            return Err(Error::validation("a confirming user id is required"));
        }

        let _guard = self.write_lock.lock().unwrap();
        let mut observations: Vec<Observation> =
            load_typed(self.store.as_ref(), RecordKind::Observations)?;
        let idx = observations
            .iter()
            .position(|o| o.id == observation_id)
            .ok_or_else(|| Error::not_found("observation", observation_id.to_string()))?;

        if observations[idx]
            .confirmation_user_ids
            .iter()
            .any(|u| u == user_id)
        {
            debug!(
                "user '{}' already confirmed observation {}",
                user_id, observation_id
            );
            return Ok(Confirmation {
                observation: observations[idx].clone(),
                already_confirmed: true,
            });
        }

        observations[idx].confirmations += 1;
        observations[idx].confirmation_user_ids.push(user_id.to_string());
        let confirmed = observations[idx].clone();
        save_typed(self.store.as_ref(), RecordKind::Observations, &observations)?;
        Ok(Confirmation {
            observation: confirmed,
            already_confirmed: false,
        })
    }

    /// All observations, newest first. Records whose timestamp no
    /// longer parses sort last instead of disappearing.
    pub fn list(&self) -> Result<Vec<Observation>> {
        let mut observations: Vec<Observation> =
            load_typed(self.store.as_ref(), RecordKind::Observations)?;
        observations.sort_by(|a, b| parse_timestamp(&b.timestamp).cmp(&parse_timestamp(&a.timestamp)));
        Ok(observations)
    }

    /// Observations inside an inclusive time range, newest first.
    /// Unparseable timestamps cannot be ranged over and are excluded.
    pub fn in_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Observation>> {
        let observations: Vec<Observation> =
            load_typed(self.store.as_ref(), RecordKind::Observations)?;
        let mut matching: Vec<(DateTime<Utc>, Observation)> = observations
            .into_iter()
            .filter_map(|o| parse_timestamp(&o.timestamp).map(|t| (t, o)))
            .filter(|(t, _)| {
                start.map_or(true, |s| *t >= s) && end.map_or(true, |e| *t <= e)
            })
            .collect();
        matching.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(matching.into_iter().map(|(_, o)| o).collect())
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn empty_log() -> ObservationLog {
        ObservationLog::new(Arc::new(MemoryStore::default()))
    }

    fn stored(id: u64, timestamp: &str) -> Observation {
        Observation {
            id,
            lat: 46.0,
            lon: 7.0,
            timestamp: timestamp.to_string(),
            confirmations: 1,
            ..Default::default()
        }
    }

    fn seeded_log() -> ObservationLog {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::default());
        let observations = vec![
            stored(1, "2024-03-10T10:00:00Z"),
            stored(2, "2024-03-12T10:00:00Z"),
            stored(3, "not-a-time"),
        ];
        save_typed(store.as_ref(), RecordKind::Observations, &observations).unwrap();
        ObservationLog::new(store)
    }

    #[test]
    fn test_report_assigns_sequential_ids() {
        let log = empty_log();
        let mut draft = ObservationDraft::new(46.0, 7.0);
        draft.created_by = Some("alice".to_string());

        let first = log.report(draft).unwrap();
        let second = log.report(ObservationDraft::new(46.1, 7.1)).unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.confirmations, 1);
        assert_eq!(first.confirmation_user_ids, vec!["alice".to_string()]);
        // Anonymous reports still count the reporter
        assert_eq!(second.confirmations, 1);
        assert!(second.confirmation_user_ids.is_empty());
    }

    #[test]
    fn test_report_rejects_danger_out_of_range() {
        let log = empty_log();
        for danger in [0u8, 6] {
            let mut draft = ObservationDraft::new(46.0, 7.0);
            draft.danger = Some(danger);
            assert!(matches!(log.report(draft), Err(Error::Validation(_))));
        }

        let mut draft = ObservationDraft::new(46.0, 7.0);
        draft.danger = Some(3);
        assert!(log.report(draft).is_ok());
    }

    #[test]
    fn test_slope_is_recorded_in_degrees() {
        let log = empty_log();
        let mut draft = ObservationDraft::new(46.0, 7.0);
        draft.slope = Some(38.5);
        let reported = log.report(draft).unwrap();
        assert_eq!(reported.slope, Some(38.5));

        let json = serde_json::to_value(&reported).unwrap();
        assert_eq!(json["slope"], serde_json::json!(38.5));
    }

    #[test]
    fn test_confirm_increments_once_per_user() {
        let log = empty_log();
        let mut draft = ObservationDraft::new(46.0, 7.0);
        draft.created_by = Some("alice".to_string());
        let reported = log.report(draft).unwrap();

        let confirmed = log.confirm(reported.id, "bob").unwrap();
        assert!(!confirmed.already_confirmed);
        assert_eq!(confirmed.observation.confirmations, 2);

        let again = log.confirm(reported.id, "bob").unwrap();
        assert!(again.already_confirmed);
        assert_eq!(again.observation.confirmations, 2);

        // The reporter's auto-confirmation blocks a second one too
        let creator = log.confirm(reported.id, "alice").unwrap();
        assert!(creator.already_confirmed);

        let persisted = log.list().unwrap();
        assert_eq!(persisted[0].confirmations, 2);
    }

    #[test]
    fn test_confirm_unknown_or_anonymous() {
        let log = empty_log();
        assert!(matches!(
            log.confirm(99, "bob"),
            Err(Error::NotFound { .. })
        ));

        log.report(ObservationDraft::new(46.0, 7.0)).unwrap();
        assert!(matches!(log.confirm(1, "  "), Err(Error::Validation(_))));
    }

    #[test]
    fn test_list_newest_first_with_broken_timestamps_last() {
        let log = seeded_log();
        let ids: Vec<u64> = log.list().unwrap().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_in_range_is_inclusive_and_skips_unparseable() {
        let log = seeded_log();

        let all = log.in_range(None, None).unwrap();
        let ids: Vec<u64> = all.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![2, 1]);

        let after = log
            .in_range(Some(Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap()), None)
            .unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].id, 2);

        let exact = Utc.with_ymd_and_hms(2024, 3, 10, 10, 0, 0).unwrap();
        let bounded = log.in_range(Some(exact), Some(exact)).unwrap();
        assert_eq!(bounded.len(), 1);
        assert_eq!(bounded[0].id, 1);
    }
}
