use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};

use crate::{
    error::AppError,
    storage::{
        store::StorageManager,
        types::vector_index::{IndexHandle, VectorIndex},
    },
};

const INDEX_FILE_NAME: &str = "index.json";

/// Durable per-video index storage: one directory per video id holding a
/// single self-describing `index.json`.
#[derive(Clone)]
pub struct IndexStore {
    storage: StorageManager,
}

impl IndexStore {
    pub fn new(storage: StorageManager) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    fn location(video_id: &str) -> String {
        format!("{video_id}/{INDEX_FILE_NAME}")
    }

    pub async fn has(&self, video_id: &str) -> Result<bool, AppError> {
        self.storage
            .exists(&Self::location(video_id))
            .await
            .map_err(|e| AppError::Storage(format!("checking index for {video_id}: {e}")))
    }

    pub async fn load(&self, video_id: &str) -> Result<IndexHandle, AppError> {
        let bytes = match self.storage.get(&Self::location(video_id)).await {
            Ok(bytes) => bytes,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(AppError::NotFound(format!("no stored index for {video_id}")))
            }
            Err(e) => {
                return Err(AppError::Storage(format!(
                    "reading index for {video_id}: {e}"
                )))
            }
        };

        let index: VectorIndex = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::Storage(format!("decoding index for {video_id}: {e}")))?;
        index.validate()?;

        debug!(
            video_id,
            chunks = index.len(),
            dimension = index.dimension,
            "loaded index from storage"
        );

        Ok(Arc::new(index))
    }

    pub async fn save(&self, video_id: &str, index: &VectorIndex) -> Result<(), AppError> {
        let body = serde_json::to_vec(index)
            .map_err(|e| AppError::Storage(format!("encoding index for {video_id}: {e}")))?;
        let size_bytes = body.len();

        self.storage
            .put(&Self::location(video_id), Bytes::from(body))
            .await
            .map_err(|e| AppError::Storage(format!("writing index for {video_id}: {e}")))?;

        info!(video_id, size_bytes, chunks = index.len(), "persisted index");
        Ok(())
    }

    /// Drop the stored index for a video, if any.
    pub async fn remove(&self, video_id: &str) -> Result<(), AppError> {
        self.storage
            .delete_prefix(video_id)
            .await
            .map_err(|e| AppError::Storage(format!("removing index for {video_id}: {e}")))
    }
}
