use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// A cached query result and the moment it was fetched. Staleness policy is
/// the caller's: `fetched_at` is exposed, nothing expires on its own.
#[derive(Debug, Clone)]
pub struct CachedQuery<T> {
    pub fetched_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub data: T,
}

/// Caller-owned key-value store for query results with tag-based
/// invalidation: after a mutation elsewhere, `invalidate` drops every entry
/// carrying the affected tag. There is no process-global instance; owners
/// pass the store by reference to whoever needs it.
#[derive(Debug)]
pub struct SnapshotCache<T> {
    entries: HashMap<String, CachedQuery<T>>,
}

impl<T> Default for SnapshotCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> SnapshotCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, tags: Vec<String>, data: T) {
        self.entries.insert(
            key.into(),
            CachedQuery {
                fetched_at: Utc::now(),
                tags,
                data,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<&CachedQuery<T>> {
        self.entries.get(key)
    }

    /// Remove every entry tagged with `tag`; returns how many were dropped.
    pub fn invalidate(&mut self, tag: &str) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, cached| !cached.tags.iter().any(|t| t == tag));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
