//! Track geometry analytics.
//!
//! Pure functions over an ordered GPS point sequence:
//! - great-circle distance (haversine)
//! - planned-track stats for routes (distance, elevation gain)
//! - measured-activity stats for days (adds loss, duration, pace, VAM)
//! - the estimated-duration formula used by read-side views
//!
//! Every derived value is optional: absent means "unknown", never zero. A
//! track with fewer than 2 points yields no values at all, and a metric is
//! only reported when its contributing total is strictly positive. There is
//! no noise filtering; every recorded elevation oscillation counts.

use serde::{Deserialize, Serialize};

use crate::TrackPoint;

/// Mean Earth radius in kilometers (planned-track distances).
pub const EARTH_RADIUS_KM: f64 = 6371.0;
/// Mean Earth radius in meters (measured-activity distances).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

// ============================================================================
// Distance
// ============================================================================

/// Central angle between two points on the unit sphere (haversine formula).
fn central_angle(a: &TrackPoint, b: &TrackPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Great-circle distance between two points in kilometers.
///
/// # Example
/// ```
/// use tourlog::{geometry::haversine_km, TrackPoint};
///
/// let a = TrackPoint::new(46.0, 7.0);
/// let b = TrackPoint::new(46.01, 7.0);
/// let d = haversine_km(&a, &b);
/// assert!((d - 1.112).abs() < 0.001);
/// ```
pub fn haversine_km(a: &TrackPoint, b: &TrackPoint) -> f64 {
    EARTH_RADIUS_KM * central_angle(a, b)
}

/// Great-circle distance between two points in meters.
pub fn haversine_m(a: &TrackPoint, b: &TrackPoint) -> f64 {
    EARTH_RADIUS_M * central_angle(a, b)
}

// ============================================================================
// Planned-track stats (route level)
// ============================================================================

/// Derived columns for a route's planned track.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackStats {
    /// Total distance in kilometers, 2 decimals.
    pub distance_km: Option<f64>,
    /// Total elevation gain in meters, rounded to the nearest integer.
    pub gain_m: Option<i64>,
}

/// Compute distance and elevation gain for a planned track.
///
/// A point pair only contributes to gain when both endpoints carry an
/// elevation; such a pair still contributes to distance.
pub fn planned_stats(points: &[TrackPoint]) -> TrackStats {
    if points.len() < 2 {
        return TrackStats::default();
    }

    let mut distance_km = 0.0;
    let mut gain_m = 0.0;

    for pair in points.windows(2) {
        distance_km += haversine_km(&pair[0], &pair[1]);
        if let (Some(ea), Some(eb)) = (pair[0].ele, pair[1].ele) {
            let delta = eb - ea;
            if delta > 0.0 {
                gain_m += delta;
            }
        }
    }

    let gain = gain_m.round() as i64;
    TrackStats {
        distance_km: (distance_km > 0.0).then(|| round2(distance_km)),
        gain_m: (gain != 0).then_some(gain),
    }
}

// ============================================================================
// Measured-activity stats (day level)
// ============================================================================

/// Statistics measured from a recorded activity track with timestamps.
///
/// Stored on a day as an optional sub-record; every field is individually
/// optional and omitted from JSON when absent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ActivityStats {
    /// Total distance in kilometers, 2 decimals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    /// Total elevation gain in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gain_m: Option<i64>,
    /// Total elevation loss in meters (absolute value).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss_m: Option<i64>,
    /// Moving time in hours, 2 decimals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_h: Option<f64>,
    /// Pace in minutes per kilometer, 1 decimal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pace_min_per_km: Option<f64>,
    /// Vertical ascent rate in meters per hour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vam: Option<i64>,
    /// Time spent ascending in hours, 2 decimals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up_hours: Option<f64>,
    /// Time spent descending in hours, 2 decimals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down_hours: Option<f64>,
}

/// Compute measured-activity statistics from a recorded track.
///
/// Returns `None` for fewer than 2 points. Within a pair:
/// - distance always accumulates;
/// - gain/loss accumulate only when both endpoints carry an elevation;
/// - moving time accumulates only for a strictly positive timestamp delta,
///   and the delta is attributed to up/down time only when the pair also
///   has an elevation delta in that direction.
pub fn activity_stats(points: &[TrackPoint]) -> Option<ActivityStats> {
    if points.len() < 2 {
        return None;
    }

    let mut distance_m = 0.0;
    let mut gain_m = 0.0;
    let mut loss_m = 0.0;
    let mut moving_s = 0.0;
    let mut up_s = 0.0;
    let mut down_s = 0.0;

    for pair in points.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        distance_m += haversine_m(a, b);

        let delta_ele = match (a.ele, b.ele) {
            (Some(ea), Some(eb)) => {
                let delta = eb - ea;
                if delta > 0.0 {
                    gain_m += delta;
                } else if delta < 0.0 {
                    loss_m += -delta;
                }
                Some(delta)
            }
            _ => None,
        };

        if let (Some(ta), Some(tb)) = (a.time, b.time) {
            let dt = (tb - ta).num_milliseconds() as f64 / 1000.0;
            if dt > 0.0 {
                moving_s += dt;
                match delta_ele {
                    Some(d) if d > 0.0 => up_s += dt,
                    Some(d) if d < 0.0 => down_s += dt,
                    _ => {}
                }
            }
        }
    }

    let gain = gain_m.round() as i64;
    let loss = loss_m.round() as i64;

    // Pace and VAM divide by the reported (rounded) distance and duration,
    // so the derived figures agree with the stored ones.
    let distance_km = (distance_m > 0.0).then(|| round2(distance_m / 1000.0));
    let duration_h = (moving_s > 0.0).then(|| round2(moving_s / 3600.0));
    let pace_min_per_km = match distance_km {
        Some(d) if d > 0.0 && moving_s > 0.0 => Some(round1((moving_s / 60.0) / d)),
        _ => None,
    };
    let vam = match duration_h {
        Some(h) if h > 0.0 && gain_m > 0.0 => Some((gain_m / h).round() as i64),
        _ => None,
    };

    Some(ActivityStats {
        distance_km,
        gain_m: (gain != 0).then_some(gain),
        loss_m: (loss != 0).then_some(loss),
        duration_h,
        pace_min_per_km,
        vam,
        up_hours: (up_s > 0.0).then(|| round2(up_s / 3600.0)),
        down_hours: (down_s > 0.0).then(|| round2(down_s / 3600.0)),
    })
}

// ============================================================================
// Estimated duration
// ============================================================================

/// Estimated travel time in hours from planned distance and gain.
///
/// One hour per 3 km plus one hour per 400 m of climb; a missing input
/// contributes nothing. Returns `None` only when both inputs are absent.
pub fn estimated_hours(distance_km: Option<f64>, gain_m: Option<i64>) -> Option<f64> {
    if distance_km.is_none() && gain_m.is_none() {
        return None;
    }
    let hours = distance_km.unwrap_or(0.0) / 3.0 + gain_m.unwrap_or(0) as f64 / 400.0;
    Some(round2(hours))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ============================================================================
// Tests
// ============================================================================
