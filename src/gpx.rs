//! GPX track source.
//!
//! Reads track points and then route points in document order out of a
//! GPX stream. This is a degraded-input boundary: malformed XML or a
//! document without usable points yields an empty point list, never an
//! error, and a point with an unusable timestamp keeps its coordinates
//! and drops only the time.

use std::io::BufRead;

use chrono::{DateTime, Utc};
use log::warn;

use crate::TrackPoint;

/// Parse every point of a GPX document, track points first.
///
/// # Example
/// ```
/// use tourlog::gpx::parse_track;
///
/// let doc = r#"<?xml version="1.0" encoding="UTF-8"?>
/// <gpx version="1.1" creator="unit"><trk><trkseg>
///   <trkpt lat="46.0" lon="7.0"><ele>1000</ele></trkpt>
///   <trkpt lat="46.01" lon="7.0"><ele>1500</ele></trkpt>
/// </trkseg></trk></gpx>"#;
///
/// let points = parse_track(doc.as_bytes());
/// assert_eq!(points.len(), 2);
/// assert_eq!(points[0].ele, Some(1000.0));
/// ```
pub fn parse_track<R: BufRead>(reader: R) -> Vec<TrackPoint> {
    let document = match ::gpx::read(reader) {
        Ok(document) => document,
        Err(e) => {
            warn!("unreadable GPX input, yielding no points: {}", e);
            return Vec::new();
        }
    };

    let mut points = Vec::new();
    for track in &document.tracks {
        for segment in &track.segments {
            for waypoint in &segment.points {
                points.push(to_track_point(waypoint));
            }
        }
    }
    for route in &document.routes {
        for waypoint in &route.points {
            points.push(to_track_point(waypoint));
        }
    }
    points
}

fn to_track_point(waypoint: &::gpx::Waypoint) -> TrackPoint {
    let position = waypoint.point();
    TrackPoint {
        lat: position.y(),
        lon: position.x(),
        ele: waypoint.elevation,
        time: waypoint.time.as_ref().and_then(to_utc),
    }
}

// The gpx crate carries timestamps as `time` crate values; round-tripping
// through the ISO-8601 rendering avoids a second datetime dependency.
fn to_utc(time: &::gpx::Time) -> Option<DateTime<Utc>> {
    let rendered = time.format().ok()?;
    DateTime::parse_from_rfc3339(&rendered)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FULL_DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="unit">
  <trk><trkseg>
    <trkpt lat="46.0" lon="7.0"><ele>1000</ele><time>2024-03-10T10:00:00Z</time></trkpt>
    <trkpt lat="46.01" lon="7.0"><ele>1500</ele><time>2024-03-10T11:00:00Z</time></trkpt>
  </trkseg></trk>
  <rte>
    <rtept lat="46.02" lon="7.0"></rtept>
  </rte>
</gpx>"#;

    #[test]
    fn test_parses_track_then_route_points() {
        let points = parse_track(FULL_DOC.as_bytes());
        assert_eq!(points.len(), 3);

        assert_eq!(points[0].lat, 46.0);
        assert_eq!(points[0].lon, 7.0);
        assert_eq!(points[0].ele, Some(1000.0));
        assert_eq!(
            points[0].time,
            Some(Utc.with_ymd_and_hms(2024, 3, 10, 10, 0, 0).unwrap())
        );

        // Route point comes last and carries no elevation or time
        assert_eq!(points[2].lat, 46.02);
        assert_eq!(points[2].ele, None);
        assert_eq!(points[2].time, None);
    }

    #[test]
    fn test_malformed_input_yields_no_points() {
        assert!(parse_track(&b"this is not xml"[..]).is_empty());
        assert!(parse_track(&b"<gpx version=\"1.1\"><trk>"[..]).is_empty());
    }

    #[test]
    fn test_document_without_points_yields_none() {
        let doc = r#"<?xml version="1.0"?><gpx version="1.1" creator="unit"></gpx>"#;
        assert!(parse_track(doc.as_bytes()).is_empty());
    }

    #[test]
    fn test_point_without_optional_fields() {
        let doc = r#"<?xml version="1.0"?>
<gpx version="1.1" creator="unit"><trk><trkseg>
  <trkpt lat="45.5" lon="6.8"></trkpt>
</trkseg></trk></gpx>"#;

        let points = parse_track(doc.as_bytes());
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].ele, None);
        assert_eq!(points[0].time, None);
    }
}
