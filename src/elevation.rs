//! Elevation enrichment for tracks recorded without altitude.
//!
//! Enrichment is best effort. A lookup that fails or answers with the
//! wrong number of values leaves the track exactly as it came in, so a
//! flaky elevation backend can never corrupt or lose a recording.

use log::{debug, warn};

use crate::TrackPoint;

/// A bulk elevation lookup, one value per `(lat, lon)` pair in order.
pub trait ElevationSource {
    fn lookup(&self, coords: &[(f64, f64)]) -> Result<Vec<f64>, String>;
}

/// Fill in missing elevations from `source`, keeping recorded ones.
///
/// Returns the input untouched when every point already has an
/// elevation, and falls back to the input on any lookup failure.
pub fn ensure_elevation(points: Vec<TrackPoint>, source: &dyn ElevationSource) -> Vec<TrackPoint> {
    if points.iter().all(|p| p.ele.is_some()) {
        return points;
    }

    let coords: Vec<(f64, f64)> = points.iter().map(|p| (p.lat, p.lon)).collect();
    let elevations = match source.lookup(&coords) {
        Ok(elevations) => elevations,
        Err(e) => {
            warn!("elevation lookup failed, keeping track as recorded: {}", e);
            return points;
        }
    };
    if elevations.len() != points.len() {
        warn!(
            "elevation lookup answered {} values for {} points, keeping track as recorded",
            elevations.len(),
            points.len()
        );
        return points;
    }

    debug!("enriched {} track points with elevation", points.len());
    points
        .into_iter()
        .zip(elevations)
        .map(|(mut point, elevation)| {
            if point.ele.is_none() {
                point.ele = Some(elevation);
            }
            point
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FixedSource {
        values: Vec<f64>,
        calls: Cell<u32>,
    }

    impl FixedSource {
        fn new(values: Vec<f64>) -> Self {
            Self {
                values,
                calls: Cell::new(0),
            }
        }
    }

    impl ElevationSource for FixedSource {
        fn lookup(&self, _coords: &[(f64, f64)]) -> Result<Vec<f64>, String> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.values.clone())
        }
    }

    struct FailingSource;

    impl ElevationSource for FailingSource {
        fn lookup(&self, _coords: &[(f64, f64)]) -> Result<Vec<f64>, String> {
            Err("service unavailable".to_string())
        }
    }

    fn bare_points() -> Vec<TrackPoint> {
        vec![TrackPoint::new(46.0, 7.0), TrackPoint::new(46.01, 7.0)]
    }

    #[test]
    fn test_fills_missing_elevations() {
        let source = FixedSource::new(vec![1000.0, 1500.0]);
        let enriched = ensure_elevation(bare_points(), &source);
        assert_eq!(enriched[0].ele, Some(1000.0));
        assert_eq!(enriched[1].ele, Some(1500.0));
    }

    #[test]
    fn test_recorded_elevation_wins_over_lookup() {
        let source = FixedSource::new(vec![1000.0, 1500.0]);
        let mut points = bare_points();
        points[0].ele = Some(999.0);

        let enriched = ensure_elevation(points, &source);
        assert_eq!(enriched[0].ele, Some(999.0));
        assert_eq!(enriched[1].ele, Some(1500.0));
    }

    #[test]
    fn test_complete_track_skips_lookup() {
        let source = FixedSource::new(vec![0.0, 0.0]);
        let mut points = bare_points();
        points[0].ele = Some(1000.0);
        points[1].ele = Some(1500.0);

        let enriched = ensure_elevation(points.clone(), &source);
        assert_eq!(enriched, points);
        assert_eq!(source.calls.get(), 0);
    }

    #[test]
    fn test_lookup_failure_keeps_original_points() {
        let points = bare_points();
        let enriched = ensure_elevation(points.clone(), &FailingSource);
        assert_eq!(enriched, points);
    }

    #[test]
    fn test_count_mismatch_keeps_original_points() {
        let source = FixedSource::new(vec![1000.0]);
        let points = bare_points();
        let enriched = ensure_elevation(points.clone(), &source);
        assert_eq!(enriched, points);
    }
}
