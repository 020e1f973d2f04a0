//! Deterministic entity identity derived from names and track content.
//!
//! A route's id is `slug(name)` plus a short fingerprint of its track, so
//! that "the same named route" can be told apart from a renamed route over
//! the same ground, and a re-used name over different ground forks into a
//! new identity instead of overwriting.

use sha2::{Digest, Sha256};

use crate::TrackPoint;

/// Number of hex characters kept from the track digest.
const FINGERPRINT_LEN: usize = 8;

/// Lowercase a string and collapse every run of non-alphanumeric
/// characters (underscore included) into a single hyphen.
///
/// # Example
/// ```
/// use tourlog::identity::slugify;
///
/// assert_eq!(slugify("Piz Palü -- Ostgipfel"), "piz-palü-ostgipfel");
/// assert_eq!(slugify("__Monte_Rosa__"), "monte-rosa");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_sep = false;

    for c in text.to_lowercase().chars() {
        if c.is_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('-');
            }
            pending_sep = false;
            slug.push(c);
        } else {
            pending_sep = true;
        }
    }

    slug
}

/// Short stable fingerprint of a track's coordinate sequence.
///
/// Coordinates are truncated to 5 decimal places (about 1 m of precision)
/// before hashing, so sub-meter jitter in a re-upload does not change the
/// fingerprint as long as the recorded coordinates round the same way.
/// An empty track has an empty fingerprint.
pub fn track_fingerprint(points: &[TrackPoint]) -> String {
    if points.is_empty() {
        return String::new();
    }

    let mut hasher = Sha256::new();
    for p in points {
        hasher.update(format!("{:.5},{:.5};", p.lat, p.lon).as_bytes());
    }
    let digest = hasher.finalize();
    let hex = format!("{:x}", digest);
    hex[..FINGERPRINT_LEN].to_string()
}

/// Content-derived route identity: `slug(name)` joined with the track
/// fingerprint when one exists, the bare slug otherwise.
pub fn route_identity(name: &str, points: &[TrackPoint]) -> String {
    let slug = slugify(name);
    let fingerprint = track_fingerprint(points);
    if fingerprint.is_empty() {
        slug
    } else {
        format!("{}-{}", slug, fingerprint)
    }
}

/// Base id for a day record: the slug of `date` and `route_id` joined.
/// Collision handling (the `_2`, `_3` suffixes) belongs to the repository.
pub fn day_id_base(date: &str, route_id: &str) -> String {
    slugify(&format!("{}_{}", date, route_id))
}
