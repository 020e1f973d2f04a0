//! Posts and comments on logged days.
//!
//! A post is a short message attached to one day; comments hang off a
//! post. This module only stores and orders the feed. Whether the author
//! or reader may touch a given day's feed is decided by the caller
//! against the visibility engine, see [`crate::logbook::Logbook`].

use std::sync::{Arc, Mutex};

use chrono::Utc;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::store::{load_typed, save_typed, RecordKind, RecordStore};

/// A message posted on a day.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub id: u64,
    pub day_id: String,
    pub user_id: String,
    pub text: String,
    /// Creation time, ISO-8601 UTC
    #[serde(default)]
    pub created_at: String,
}

/// A reply to a post.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub id: u64,
    pub post_id: u64,
    pub user_id: String,
    pub text: String,
    /// Creation time, ISO-8601 UTC
    #[serde(default)]
    pub created_at: String,
}

/// Post and comment collections over a record store.
pub struct PostFeed {
    store: Arc<dyn RecordStore>,
    write_lock: Mutex<()>,
}

impl PostFeed {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Attach a post to a day.
    pub fn add_post(&self, day_id: &str, user_id: &str, text: &str) -> Result<Post> {
        let text = text.trim();
        if day_id.is_empty() {
            return Err(Error::validation("a post needs a day id"));
        }
        if user_id.is_empty() {
            return Err(Error::validation("a post needs an author"));
        }
        if text.is_empty() {
            return Err(Error::validation("a post needs some text"));
        }

        let _guard = self.write_lock.lock().unwrap();
        let mut posts: Vec<Post> = load_typed(self.store.as_ref(), RecordKind::Posts)?;

        let post = Post {
            id: posts.iter().map(|p| p.id).max().unwrap_or(0) + 1,
            day_id: day_id.to_string(),
            user_id: user_id.to_string(),
            text: text.to_string(),
            created_at: Utc::now().to_rfc3339(),
        };
        debug!("added post {} on day '{}'", post.id, post.day_id);

        posts.push(post.clone());
        save_typed(self.store.as_ref(), RecordKind::Posts, &posts)?;
        Ok(post)
    }

    /// Look up one post by id.
    pub fn get_post(&self, post_id: u64) -> Result<Option<Post>> {
        let posts: Vec<Post> = load_typed(self.store.as_ref(), RecordKind::Posts)?;
        Ok(posts.into_iter().find(|p| p.id == post_id))
    }

    /// A day's posts, newest first.
    pub fn posts_for_day(&self, day_id: &str) -> Result<Vec<Post>> {
        let posts: Vec<Post> = load_typed(self.store.as_ref(), RecordKind::Posts)?;
        let mut posts: Vec<Post> = posts.into_iter().filter(|p| p.day_id == day_id).collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    /// Reply to an existing post.
    pub fn add_comment(&self, post_id: u64, user_id: &str, text: &str) -> Result<Comment> {
        let text = text.trim();
        if user_id.is_empty() {
            return Err(Error::validation("a comment needs an author"));
        }
        if text.is_empty() {
            return Err(Error::validation("a comment needs some text"));
        }

        let _guard = self.write_lock.lock().unwrap();
        let posts: Vec<Post> = load_typed(self.store.as_ref(), RecordKind::Posts)?;
        if !posts.iter().any(|p| p.id == post_id) {
            return Err(Error::not_found("post", post_id.to_string()));
        }

        let mut comments: Vec<Comment> = load_typed(self.store.as_ref(), RecordKind::Comments)?;
        let comment = Comment {
            id: comments.iter().map(|c| c.id).max().unwrap_or(0) + 1,
            post_id,
            user_id: user_id.to_string(),
            text: text.to_string(),
            created_at: Utc::now().to_rfc3339(),
        };
        debug!("added comment {} on post {}", comment.id, post_id);

        comments.push(comment.clone());
        save_typed(self.store.as_ref(), RecordKind::Comments, &comments)?;
        Ok(comment)
    }

    /// A post's comments, oldest first, so a thread reads top to bottom.
    pub fn comments_for_post(&self, post_id: u64) -> Result<Vec<Comment>> {
        let comments: Vec<Comment> = load_typed(self.store.as_ref(), RecordKind::Comments)?;
        let mut comments: Vec<Comment> = comments
            .into_iter()
            .filter(|c| c.post_id == post_id)
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn empty_feed() -> PostFeed {
        PostFeed::new(Arc::new(MemoryStore::default()))
    }

    fn stored_post(id: u64, day_id: &str, created_at: &str) -> Post {
        Post {
            id,
            day_id: day_id.to_string(),
            user_id: "ana".to_string(),
            text: format!("post {}", id),
            created_at: created_at.to_string(),
        }
    }

    #[test]
    fn test_add_post_assigns_sequential_ids() {
        let feed = empty_feed();
        let first = feed.add_post("d1", "ana", "great corn snow").unwrap();
        let second = feed.add_post("d1", "beto", "  windy up high  ").unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(second.text, "windy up high");
        assert_eq!(feed.get_post(1).unwrap().unwrap().text, "great corn snow");
        assert!(feed.get_post(99).unwrap().is_none());
    }

    #[test]
    fn test_add_post_validation() {
        let feed = empty_feed();
        for (day, user, text) in [("", "ana", "x"), ("d1", "", "x"), ("d1", "ana", "   ")] {
            assert!(matches!(
                feed.add_post(day, user, text),
                Err(Error::Validation(_))
            ));
        }
        assert!(feed.posts_for_day("d1").unwrap().is_empty());
    }

    #[test]
    fn test_posts_list_newest_first_per_day() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::default());
        let posts = vec![
            stored_post(1, "d1", "2024-03-10T10:00:00+00:00"),
            stored_post(2, "d2", "2024-03-10T11:00:00+00:00"),
            stored_post(3, "d1", "2024-03-10T12:00:00+00:00"),
        ];
        save_typed(store.as_ref(), RecordKind::Posts, &posts).unwrap();
        let feed = PostFeed::new(store);

        let ids: Vec<u64> = feed
            .posts_for_day("d1")
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn test_comments_require_a_post_and_read_oldest_first() {
        let feed = empty_feed();
        assert!(matches!(
            feed.add_comment(1, "beto", "nice"),
            Err(Error::NotFound { .. })
        ));

        let post = feed.add_post("d1", "ana", "skinned up early").unwrap();
        let first = feed.add_comment(post.id, "beto", "how was the crust?").unwrap();
        let second = feed.add_comment(post.id, "ana", "solid until noon").unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        let ids: Vec<u64> = feed
            .comments_for_post(post.id)
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_add_comment_validation() {
        let feed = empty_feed();
        let post = feed.add_post("d1", "ana", "hello").unwrap();
        assert!(matches!(
            feed.add_comment(post.id, "", "x"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            feed.add_comment(post.id, "beto", "  "),
            Err(Error::Validation(_))
        ));
        assert!(feed.comments_for_post(post.id).unwrap().is_empty());
    }
}
