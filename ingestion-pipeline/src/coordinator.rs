use std::{fmt, sync::Arc, time::Instant};

use common::{
    error::AppError,
    storage::{index_store::IndexStore, types::vector_index::IndexHandle},
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{lock_registry::KeyedLockRegistry, memory_cache::MemoryCache, pipeline::IndexBuilder};

/// Where a ready index came from on a given call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IngestionSource {
    #[serde(rename = "ram")]
    Memory,
    #[serde(rename = "disk")]
    Storage,
    #[serde(rename = "built")]
    Built,
}

impl IngestionSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "ram",
            Self::Storage => "disk",
            Self::Built => "built",
        }
    }
}

impl fmt::Display for IngestionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Makes sure a video's index is in memory before it is queried.
///
/// Resolution order is memory, then the persistent store, then a fresh
/// build. Everything past the first memory lookup happens under the video's
/// lock, so a given video is loaded or built at most once per process.
#[derive(Clone)]
pub struct IngestionCoordinator {
    cache: MemoryCache,
    locks: KeyedLockRegistry,
    store: IndexStore,
    builder: Arc<IndexBuilder>,
}

impl IngestionCoordinator {
    pub fn new(store: IndexStore, builder: Arc<IndexBuilder>) -> Self {
        Self {
            cache: MemoryCache::new(),
            locks: KeyedLockRegistry::new(),
            store,
            builder,
        }
    }

    pub fn cache(&self) -> &MemoryCache {
        &self.cache
    }

    pub fn locks(&self) -> &KeyedLockRegistry {
        &self.locks
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// The in-memory index for `video_id`, if it has been made ready.
    pub fn index(&self, video_id: &str) -> Option<IndexHandle> {
        self.cache.get(video_id)
    }

    /// Ensure `video_id` is queryable from memory and report how it got there.
    ///
    /// The locked part runs on its own task: if the caller goes away the
    /// load or build still finishes and lands in the cache for whoever asks
    /// next. Errors are returned unchanged and nothing is cached for them.
    #[tracing::instrument(skip_all, fields(video_id = %video_id))]
    pub async fn ensure_ready(&self, video_id: &str) -> Result<IngestionSource, AppError> {
        let started = Instant::now();

        if self.cache.contains(video_id) {
            debug!(source = %IngestionSource::Memory, "index already in memory");
            return Ok(IngestionSource::Memory);
        }

        let coordinator = self.clone();
        let owned_id = video_id.to_owned();
        let result = tokio::spawn(async move { coordinator.resolve_locked(&owned_id).await })
            .await
            .map_err(AppError::from)
            .and_then(|inner| inner);

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &result {
            Ok(source) => info!(source = %source, elapsed_ms, "index ready"),
            Err(err) => warn!(error = %err, elapsed_ms, "failed to make index ready"),
        }

        result
    }

    async fn resolve_locked(&self, video_id: &str) -> Result<IngestionSource, AppError> {
        let _guard = self.locks.acquire(video_id).await;

        // Another caller may have finished while we waited for the lock.
        if self.cache.contains(video_id) {
            return Ok(IngestionSource::Memory);
        }

        if self.store.has(video_id).await? {
            let index = self.store.load(video_id).await?;
            self.cache.put(video_id, index);
            return Ok(IngestionSource::Storage);
        }

        let index = self.builder.build(video_id).await?;
        self.cache.put(video_id, index);
        Ok(IngestionSource::Built)
    }
}
