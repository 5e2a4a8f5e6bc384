//! In-memory registry of comment ids that already went through the pipeline.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Default)]
pub struct ProcessedCommentRegistry {
    seen: HashMap<u64, DateTime<Utc>>,
}

impl ProcessedCommentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, comment_id: u64) -> bool {
        self.seen.contains_key(&comment_id)
    }

    /// Inserts the id and returns `true` only if it was not present yet.
    /// An existing entry keeps its original `seen_at`.
    pub fn mark_seen(&mut self, comment_id: u64, now: DateTime<Utc>) -> bool {
        if self.seen.contains_key(&comment_id) {
            return false;
        }
        self.seen.insert(comment_id, now);
        true
    }

    pub fn seen_at(&self, comment_id: u64) -> Option<DateTime<Utc>> {
        self.seen.get(&comment_id).copied()
    }

    /// Drops entries strictly older than `now - window`; returns how many went.
    pub fn purge_older_than(&mut self, now: DateTime<Utc>, window: Duration) -> usize {
        let cutoff = now - window;
        let before = self.seen.len();
        self.seen.retain(|_, seen_at| *seen_at >= cutoff);
        before - self.seen.len()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
