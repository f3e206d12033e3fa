use std::sync::Arc;

use common::storage::types::vector_index::IndexHandle;
use dashmap::DashMap;

/// Process-wide map from video id to a ready index.
///
/// Entries are never evicted; the map grows with the number of distinct
/// videos served for the lifetime of the process.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<DashMap<String, IndexHandle>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, video_id: &str) -> Option<IndexHandle> {
        self.entries
            .get(video_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Insert or replace the handle for `video_id`.
    pub fn put(&self, video_id: impl Into<String>, index: IndexHandle) {
        self.entries.insert(video_id.into(), index);
    }

    pub fn contains(&self, video_id: &str) -> bool {
        self.entries.contains_key(video_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
