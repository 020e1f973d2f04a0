//! Logbook facade: guarded, merged read views over routes and days.
//!
//! The repositories store raw records and enforce nothing; this is the
//! layer that applies the visibility decision and joins a day with its
//! route for listing cards and detail views. Anything reading days on
//! behalf of a viewer should come through here.

use std::sync::Arc;

use log::debug;
use serde::Serialize;

use crate::days::{Day, DayDraft, DayRepository};
use crate::error::{Error, Result};
use crate::geometry::estimated_hours;
use crate::posts::{Comment, Post, PostFeed};
use crate::routes::{Route, RouteFilter, RouteRepository};
use crate::store::RecordStore;
use crate::visibility::{
    day_matches, is_visible, parse_day_date, DayFilter, GroupDirectory, SocialGraph, Visibility,
};

// ============================================================================
// Merged views
// ============================================================================

/// Listing card: one logged day merged with its route's headline stats.
#[derive(Debug, Clone, Serialize)]
pub struct TourSummary {
    pub day_id: String,
    pub route_id: String,
    pub name: String,
    pub date: String,
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gain_m: Option<i64>,
    /// Planned-effort estimate from the route stats, in hours
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
}

/// Detail view: the full day and route records side by side.
#[derive(Debug, Clone, Serialize)]
pub struct TourView {
    pub day: Day,
    pub route: Route,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
}

/// One post on a day together with its comments, thread order.
#[derive(Debug, Clone, Serialize)]
pub struct PostThread {
    pub post: Post,
    pub comments: Vec<Comment>,
}

// ============================================================================
// Facade
// ============================================================================

/// Read and edit entry point tying repositories to the visibility engine.
pub struct Logbook {
    routes: RouteRepository,
    days: DayRepository,
    posts: PostFeed,
    social: Arc<dyn SocialGraph>,
    groups: Arc<dyn GroupDirectory>,
}

impl Logbook {
    pub fn new(
        store: Arc<dyn RecordStore>,
        social: Arc<dyn SocialGraph>,
        groups: Arc<dyn GroupDirectory>,
    ) -> Self {
        Self {
            routes: RouteRepository::new(store.clone()),
            days: DayRepository::new(store.clone()),
            posts: PostFeed::new(store),
            social,
            groups,
        }
    }

    /// Direct route repository access. Routes carry no per-viewer state,
    /// so reads here are unguarded.
    pub fn routes(&self) -> &RouteRepository {
        &self.routes
    }

    /// Direct day repository access, bypassing visibility. Callers serving
    /// a viewer should use [`Logbook::day_for`] or [`Logbook::tours`].
    pub fn days(&self) -> &DayRepository {
        &self.days
    }

    /// A single day, only when `viewer` may see it.
    pub fn day_for(&self, day_id: &str, viewer: Option<&str>) -> Result<Day> {
        let day = self
            .days
            .get(day_id)?
            .ok_or_else(|| Error::not_found("day", day_id))?;
        if !is_visible(&day, viewer, self.social.as_ref(), self.groups.as_ref()) {
            return Err(Error::forbidden(format!(
                "day '{}' is not visible to this viewer",
                day_id
            )));
        }
        Ok(day)
    }

    /// Create or edit a day on behalf of `viewer_id`.
    ///
    /// The viewer becomes the owner of a new or ownerless day. Editing a
    /// day owned by someone else is `Forbidden`, and a draft id that
    /// resolves to nothing is `NotFound` rather than silently minting a
    /// fresh day under a new id.
    pub fn update_day(&self, viewer_id: &str, mut draft: DayDraft) -> Result<Day> {
        if viewer_id.trim().is_empty() {
            return Err(Error::forbidden("signing in is required to log a day"));
        }

        if let Some(id) = draft.id.as_deref().filter(|id| !id.is_empty()) {
            let stored = self
                .days
                .get(id)?
                .ok_or_else(|| Error::not_found("day", id))?;
            if !stored.owner_id.is_empty() && stored.owner_id != viewer_id {
                return Err(Error::forbidden(format!(
                    "day '{}' belongs to another user",
                    id
                )));
            }
        }

        draft.owner_id = Some(viewer_id.to_string());
        self.days.upsert(draft)
    }

    /// Post on a day's feed as `viewer_id`.
    ///
    /// Anyone who may see the day may post on it: an unknown day is
    /// `NotFound`, an invisible one `Forbidden`, and signing in is
    /// required.
    pub fn add_post(&self, viewer_id: &str, day_id: &str, text: &str) -> Result<Post> {
        if viewer_id.trim().is_empty() {
            return Err(Error::forbidden("signing in is required to post"));
        }
        self.day_for(day_id, Some(viewer_id))?;
        self.posts.add_post(day_id, viewer_id, text)
    }

    /// Comment on a post as `viewer_id`.
    ///
    /// An unknown post is `NotFound`; a post whose day has vanished or is
    /// not visible to the viewer is `Forbidden`.
    pub fn add_comment(&self, viewer_id: &str, post_id: u64, text: &str) -> Result<Comment> {
        if viewer_id.trim().is_empty() {
            return Err(Error::forbidden("signing in is required to comment"));
        }
        let post = self
            .posts
            .get_post(post_id)?
            .ok_or_else(|| Error::not_found("post", post_id.to_string()))?;
        match self.days.get(&post.day_id)? {
            Some(day) if is_visible(&day, Some(viewer_id), self.social.as_ref(), self.groups.as_ref()) => {}
            _ => {
                return Err(Error::forbidden(format!(
                    "the day behind post {} is not visible to this viewer",
                    post_id
                )))
            }
        }
        self.posts.add_comment(post_id, viewer_id, text)
    }

    /// Guarded post feed of a day, newest post first, each with its
    /// comments oldest first.
    pub fn post_threads(&self, day_id: &str, viewer: Option<&str>) -> Result<Vec<PostThread>> {
        self.day_for(day_id, viewer)?;
        let mut threads = Vec::new();
        for post in self.posts.posts_for_day(day_id)? {
            let comments = self.posts.comments_for_post(post.id)?;
            threads.push(PostThread { post, comments });
        }
        Ok(threads)
    }

    /// Guarded detail view of a day merged with its route.
    pub fn tour(&self, day_id: &str, viewer: Option<&str>) -> Result<TourView> {
        let day = self.day_for(day_id, viewer)?;
        let route = self
            .routes
            .get(&day.route_id)?
            .ok_or_else(|| Error::not_found("route", day.route_id.clone()))?;
        let estimate = estimated_hours(route.distance_km, route.gain_m);
        Ok(TourView {
            day,
            route,
            estimated_hours: estimate,
        })
    }

    /// Every day `viewer` may see, as listing cards, newest date first.
    /// Days whose date no longer parses sort last.
    pub fn tours(
        &self,
        viewer: Option<&str>,
        day_filter: &DayFilter,
        route_filter: &RouteFilter,
    ) -> Result<Vec<TourSummary>> {
        let routes = self.routes.list()?;
        let mut summaries = Vec::new();
        for day in self.days.list()? {
            if !day_matches(
                &day,
                viewer,
                day_filter,
                self.social.as_ref(),
                self.groups.as_ref(),
            ) {
                continue;
            }
            let route = match routes.iter().find(|r| r.id == day.route_id) {
                Some(route) => route,
                None => {
                    debug!(
                        "day '{}' references missing route '{}', skipping",
                        day.id, day.route_id
                    );
                    continue;
                }
            };
            if !route_filter.matches(route) {
                continue;
            }
            summaries.push(TourSummary {
                day_id: day.id,
                route_id: route.id.clone(),
                name: route.name.clone(),
                date: day.date,
                visibility: day.visibility,
                difficulty: route.difficulty.clone(),
                distance_km: route.distance_km,
                gain_m: route.gain_m,
                estimated_hours: estimated_hours(route.distance_km, route.gain_m),
            });
        }
        summaries.sort_by(|a, b| parse_day_date(&b.date).cmp(&parse_day_date(&a.date)));
        Ok(summaries)
    }

    /// Routes that pass `route_filter` and carry at least one day passing
    /// `day_filter` for this viewer. Map and search listings build on this.
    pub fn routes_with_visible_days(
        &self,
        viewer: Option<&str>,
        day_filter: &DayFilter,
        route_filter: &RouteFilter,
    ) -> Result<Vec<Route>> {
        let days = self.days.list()?;
        let mut routes = Vec::new();
        for route in self.routes.list()? {
            if !route_filter.matches(&route) {
                continue;
            }
            let any_visible = days.iter().any(|day| {
                day.route_id == route.id
                    && day_matches(
                        day,
                        viewer,
                        day_filter,
                        self.social.as_ref(),
                        self.groups.as_ref(),
                    )
            });
            if any_visible {
                routes.push(route);
            }
        }
        Ok(routes)
    }
}
