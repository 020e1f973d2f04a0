//! Logbook integration tests.
//!
//! Exercises the full pipeline over a JSON file store: route upsert ->
//! day logging -> visibility-guarded reads, with the store reopened
//! between steps to prove everything round-trips through the files.
//!
//! Run with: `cargo test --test logbook_flow`

use std::sync::Arc;

use tempfile::TempDir;
use tourlog::{
    CommunityStore, DayDraft, DayFilter, Error, JsonFileStore, Logbook, RouteDraft, RouteFilter,
    TrackPoint, Visibility,
};

/// Helper: logbook + community store over a JSON file store rooted in `dir`.
fn open_logbook(dir: &TempDir) -> (Logbook, Arc<CommunityStore>) {
    let store = Arc::new(JsonFileStore::new(dir.path()));
    let community = Arc::new(CommunityStore::new(store.clone()));
    let logbook = Logbook::new(store, community.clone(), community.clone());
    (logbook, community)
}

/// Helper: the two-point reference track, 1.11 km and 500 m of climbing.
fn reference_track() -> Vec<TrackPoint> {
    vec![
        TrackPoint::with_ele(46.0, 7.0, 1000.0),
        TrackPoint::with_ele(46.01, 7.0, 1500.0),
    ]
}

/// Helper: upsert a named route carrying the reference track.
fn seed_route(logbook: &Logbook, name: &str) -> tourlog::Route {
    let mut draft = RouteDraft::new(name);
    draft.track = Some(reference_track());
    logbook.routes().upsert(draft).expect("failed to upsert route")
}

// ============================================================================
// Test: Route identity and derived stats
// ============================================================================

#[test]
fn test_route_upsert_derives_identity_and_stats() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let (logbook, _) = open_logbook(&dir);

    let route = seed_route(&logbook, "Test");
    assert_eq!(route.distance_km, Some(1.11));
    assert_eq!(route.gain_m, Some(500));
    assert!(route.id.starts_with("test-"));
    assert_eq!(route.id.len(), "test-".len() + 8);
    // Last track point pins the route on the map
    assert_eq!(route.lat, Some(46.01));
    assert_eq!(route.lon, Some(7.0));

    // Same name + same track resolves to the same stored route
    let again = seed_route(&logbook, "Test");
    assert_eq!(again.id, route.id);

    let (reopened, _) = open_logbook(&dir);
    let routes = reopened.routes().list().expect("failed to list routes");
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0], route);
}

#[test]
fn test_changed_track_forks_a_new_route() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let (logbook, _) = open_logbook(&dir);

    let original = seed_route(&logbook, "Test");

    let mut draft = RouteDraft::new("Test");
    draft.id = Some(original.id.clone());
    draft.track = Some(vec![
        TrackPoint::with_ele(45.5, 6.8, 1200.0),
        TrackPoint::with_ele(45.51, 6.8, 1900.0),
    ]);
    let fork = logbook.routes().upsert(draft).expect("failed to upsert fork");

    assert_ne!(fork.id, original.id);
    let routes = logbook.routes().list().expect("failed to list routes");
    assert_eq!(routes.len(), 2);
    // The original keeps its track untouched
    let kept = logbook
        .routes()
        .get(&original.id)
        .expect("failed to read route")
        .expect("original route vanished");
    assert_eq!(kept.track, reference_track());
}

// ============================================================================
// Test: Day ids on a shared route and date
// ============================================================================

#[test]
fn test_same_route_same_date_gets_suffixed_day_ids() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let (logbook, _) = open_logbook(&dir);
    let route = seed_route(&logbook, "Test");

    let first = logbook
        .update_day("alice", DayDraft::new(&route.id, "2024-03-10"))
        .expect("failed to log first day");
    let second = logbook
        .update_day("bob", DayDraft::new(&route.id, "2024-03-10"))
        .expect("failed to log second day");
    let third = logbook
        .update_day("carol", DayDraft::new(&route.id, "2024-03-10"))
        .expect("failed to log third day");

    assert_eq!(second.id, format!("{}_2", first.id));
    assert_eq!(third.id, format!("{}_3", first.id));
    assert_eq!(first.owner_id, "alice");
    assert_eq!(second.owner_id, "bob");
}

// ============================================================================
// Test: Visibility across viewers
// ============================================================================

#[test]
fn test_private_day_is_owner_only() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let (logbook, community) = open_logbook(&dir);
    let route = seed_route(&logbook, "Test");

    let mut draft = DayDraft::new(&route.id, "2024-03-10");
    draft.visibility = Visibility::Private;
    let day = logbook.update_day("alice", draft).expect("failed to log day");

    // Even an accepted friend is locked out of a private day
    community
        .add_friend("bob", "alice")
        .expect("failed to add friend");

    let (reopened, _) = open_logbook(&dir);
    assert!(reopened.day_for(&day.id, Some("alice")).is_ok());
    assert!(matches!(
        reopened.day_for(&day.id, Some("bob")),
        Err(Error::Forbidden(_))
    ));
    assert!(matches!(
        reopened.day_for(&day.id, None),
        Err(Error::Forbidden(_))
    ));
}

#[test]
fn test_friends_day_follows_the_friendship_edge() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let (logbook, community) = open_logbook(&dir);
    let route = seed_route(&logbook, "Test");

    let mut draft = DayDraft::new(&route.id, "2024-03-10");
    draft.visibility = Visibility::Friends;
    let day = logbook.update_day("alice", draft).expect("failed to log day");

    assert!(matches!(
        logbook.day_for(&day.id, Some("bob")),
        Err(Error::Forbidden(_))
    ));

    community
        .add_friend("bob", "alice")
        .expect("failed to add friend");
    assert!(logbook.day_for(&day.id, Some("bob")).is_ok());
    // Anonymous viewers never qualify as friends
    assert!(matches!(
        logbook.day_for(&day.id, None),
        Err(Error::Forbidden(_))
    ));
}

#[test]
fn test_group_day_visible_to_members_and_public_groups_to_all() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let (logbook, community) = open_logbook(&dir);
    let route = seed_route(&logbook, "Test");

    let closed = community
        .create_group("Powder Hounds", "alice", None, false)
        .expect("failed to create group");
    let mut draft = DayDraft::new(&route.id, "2024-03-10");
    draft.visibility = Visibility::Groups;
    draft.group_ids = vec![closed.id.clone()];
    let day = logbook.update_day("alice", draft).expect("failed to log day");

    assert!(matches!(
        logbook.day_for(&day.id, Some("bob")),
        Err(Error::Forbidden(_))
    ));
    community
        .add_member(&closed.id, "bob")
        .expect("failed to add member");
    assert!(logbook.day_for(&day.id, Some("bob")).is_ok());

    // A public group opens the day to everyone, signed in or not
    let open = community
        .create_group("Open Tours", "alice", None, true)
        .expect("failed to create group");
    let mut draft = DayDraft::new(&route.id, "2024-03-11");
    draft.visibility = Visibility::Groups;
    draft.group_ids = vec![open.id];
    let open_day = logbook.update_day("alice", draft).expect("failed to log day");
    assert!(logbook.day_for(&open_day.id, None).is_ok());
}

// ============================================================================
// Test: Edit guards
// ============================================================================

#[test]
fn test_update_day_rejects_non_owners_and_stale_ids() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let (logbook, _) = open_logbook(&dir);
    let route = seed_route(&logbook, "Test");

    let day = logbook
        .update_day("alice", DayDraft::new(&route.id, "2024-03-10"))
        .expect("failed to log day");

    let mut takeover = DayDraft::new(&route.id, "2024-03-10");
    takeover.id = Some(day.id.clone());
    assert!(matches!(
        logbook.update_day("bob", takeover),
        Err(Error::Forbidden(_))
    ));

    let mut stale = DayDraft::new(&route.id, "2024-03-10");
    stale.id = Some("no-such-day".to_string());
    assert!(matches!(
        logbook.update_day("alice", stale),
        Err(Error::NotFound { .. })
    ));

    assert!(matches!(
        logbook.update_day("  ", DayDraft::new(&route.id, "2024-03-10")),
        Err(Error::Forbidden(_))
    ));
}

// ============================================================================
// Test: Post feed on a day
// ============================================================================

#[test]
fn test_post_feed_round_trips_and_respects_visibility() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let (logbook, community) = open_logbook(&dir);
    let route = seed_route(&logbook, "Test");

    let mut draft = DayDraft::new(&route.id, "2024-03-10");
    draft.visibility = Visibility::Friends;
    let day = logbook.update_day("alice", draft).expect("failed to log day");

    community
        .add_friend("bob", "alice")
        .expect("failed to add friend");
    let post = logbook
        .add_post("bob", &day.id, "incredible snow today")
        .expect("failed to add post");
    logbook
        .add_comment("alice", post.id, "come back in april")
        .expect("failed to add comment");

    // Outsiders stay locked out of the feed
    assert!(matches!(
        logbook.add_post("carol", &day.id, "hi"),
        Err(Error::Forbidden(_))
    ));
    assert!(matches!(
        logbook.add_comment("carol", post.id, "hi"),
        Err(Error::Forbidden(_))
    ));

    let (reopened, _) = open_logbook(&dir);
    let threads = reopened
        .post_threads(&day.id, Some("bob"))
        .expect("failed to read post feed");
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].post.text, "incredible snow today");
    assert_eq!(threads[0].comments.len(), 1);
    assert_eq!(threads[0].comments[0].text, "come back in april");
}

// ============================================================================
// Test: Merged listings
// ============================================================================

#[test]
fn test_tours_listing_survives_a_reopen() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let (logbook, _) = open_logbook(&dir);
    let route = seed_route(&logbook, "Test");

    logbook
        .update_day("alice", DayDraft::new(&route.id, "2024-03-10"))
        .expect("failed to log day");
    logbook
        .update_day("alice", DayDraft::new(&route.id, "2024-04-02"))
        .expect("failed to log day");

    let (reopened, _) = open_logbook(&dir);
    let tours = reopened
        .tours(Some("alice"), &DayFilter::default(), &RouteFilter::default())
        .expect("failed to list tours");

    assert_eq!(tours.len(), 2);
    let dates: Vec<&str> = tours.iter().map(|t| t.date.as_str()).collect();
    assert_eq!(dates, vec!["2024-04-02", "2024-03-10"]);
    assert_eq!(tours[0].name, "Test");
    // 1.11 km / 3 + 500 m / 400 hours
    assert_eq!(tours[0].estimated_hours, Some(1.62));

    let summaries = reopened
        .routes_with_visible_days(None, &DayFilter::default(), &RouteFilter::default())
        .expect("failed to list routes");
    assert_eq!(summaries.len(), 1);
}
