use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Session-lifetime set of bookmarked programme ids. Toggling returns a new
/// set so the type composes with the rest of the pure pipeline; callers that
/// share a set across threads copy it instead of locking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkSet {
    ids: BTreeSet<u64>,
}

impl BookmarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids(ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn toggle(&self, programme_id: u64) -> Self {
        let mut ids = self.ids.clone();
        if !ids.remove(&programme_id) {
            ids.insert(programme_id);
        }
        Self { ids }
    }

    pub fn contains(&self, programme_id: u64) -> bool {
        self.ids.contains(&programme_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.ids.iter().copied()
    }
}
