//! # Tourlog
//!
//! Core library for a backcountry ski touring logbook: GPS track
//! geometry, route identity, day records and the visibility rules that
//! decide who gets to see them.
//!
//! This library provides:
//! - Track statistics (distance, gain/loss, pace, VAM) from GPS points
//! - Content-derived route identity with fork-on-change semantics
//! - Day/outing records with owner, conditions and sharing mode
//! - A visibility engine covering friends, named people and groups
//! - Posts and comments on days, guarded by the same visibility rules
//! - JSON file persistence behind a pluggable record store
//!
//! ## Features
//!
//! - **`http`** - Enable the Open-Elevation client for track enrichment
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use tourlog::{MemoryStore, RouteDraft, RouteRepository, TrackPoint};
//!
//! let repository = RouteRepository::new(Arc::new(MemoryStore::default()));
//!
//! // Upserting by name + track derives a stable route id
//! let mut draft = RouteDraft::new("Piz Palü");
//! draft.track = Some(vec![
//!     TrackPoint::with_ele(46.0, 7.0, 1000.0),
//!     TrackPoint::with_ele(46.01, 7.0, 1500.0),
//! ]);
//!
//! let route = repository.upsert(draft).unwrap();
//! assert!(route.id.starts_with("piz-palü-"));
//! assert_eq!(route.gain_m, Some(500));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Error, Result};

// Spherical distance and track statistics
pub mod geometry;
pub use geometry::{
    activity_stats, estimated_hours, haversine_km, haversine_m, planned_stats, ActivityStats,
    TrackStats,
};

// Slugs, track fingerprints and derived record ids
pub mod identity;
pub use identity::{route_identity, slugify, track_fingerprint};

// Pluggable JSON record storage
pub mod store;
pub use store::{load_typed, save_typed, JsonFileStore, MemoryStore, RecordKind, RecordStore};

// Visibility decisions and day filtering
pub mod visibility;
pub use visibility::{
    day_matches, is_visible, parse_day_date, DayFilter, GroupDirectory, SocialGraph, Visibility,
    VisibilityCategory,
};

// Route records and their repository
pub mod routes;
pub use routes::{Route, RouteDraft, RouteFilter, RouteRepository};

// Day records and their repository
pub mod days;
pub use days::{Day, DayDraft, DayRepository};

// Friendships, groups and memberships
pub mod community;
pub use community::{CommunityStore, Friendship, Group, Membership};

// GPX track reading
pub mod gpx;
pub use self::gpx::parse_track;

// Elevation enrichment for tracks recorded without altitude
pub mod elevation;
pub use elevation::{ensure_elevation, ElevationSource};

// Avalanche observation log
pub mod observations;
pub use observations::{Confirmation, Observation, ObservationDraft, ObservationLog};

// Posts and comments on logged days
pub mod posts;
pub use posts::{Comment, Post, PostFeed};

// Guarded merged views over routes and days
pub mod logbook;
pub use logbook::{Logbook, PostThread, TourSummary, TourView};

// Open-Elevation HTTP client
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::{EnrichConfig, OpenElevationClient};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS track point: coordinates with optional elevation and time.
///
/// # Example
/// ```
/// use tourlog::TrackPoint;
/// let point = TrackPoint::new(46.55, 7.98); // Bernese Oberland
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    /// Elevation in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ele: Option<f64>,
    /// Sample time, UTC
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

impl TrackPoint {
    /// Create a point without elevation or time.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            ele: None,
            time: None,
        }
    }

    /// Create a point with elevation.
    pub fn with_ele(lat: f64, lon: f64, ele: f64) -> Self {
        Self {
            lat,
            lon,
            ele: Some(ele),
            time: None,
        }
    }

    /// Check that the coordinates are finite and in range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && self.lat >= -90.0
            && self.lat <= 90.0
            && self.lon >= -180.0
            && self.lon <= 180.0
    }
}

// ============================================================================
// Tests
// ============================================================================
