use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Held while ingesting a video; dropping it releases the video's lock.
pub type KeyLockGuard = OwnedMutexGuard<()>;

/// Lazily created mutex per video id.
///
/// Locks are created on first reference and kept for the process lifetime.
/// Insertion of a new lock happens inside a single `entry` call so two
/// callers can never end up with different locks for the same id. The map's
/// shard lock is released before the per-video mutex is awaited.
#[derive(Clone, Default)]
pub struct KeyedLockRegistry {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, video_id: &str) -> Arc<Mutex<()>> {
        if let Some(existing) = self.locks.get(video_id) {
            return Arc::clone(existing.value());
        }
        let entry = self
            .locks
            .entry(video_id.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())));
        Arc::clone(entry.value())
    }

    /// Wait for exclusive access to `video_id`.
    pub async fn acquire(&self, video_id: &str) -> KeyLockGuard {
        self.lock_for(video_id).lock_owned().await
    }

    /// Take the lock only if nobody holds it right now.
    pub fn try_acquire(&self, video_id: &str) -> Option<KeyLockGuard> {
        self.lock_for(video_id).try_lock_owned().ok()
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
