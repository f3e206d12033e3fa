use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Version of the persisted index layout; bumped on incompatible changes.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Shared, immutable reference to a ready index.
pub type IndexHandle = Arc<VectorIndex>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub position: usize,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// Transcript chunks and their embeddings for a single video.
///
/// The serialized form carries its own format version and embedding
/// metadata so a stored index can be validated without outside context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndex {
    pub format_version: u32,
    pub video_id: String,
    pub created_at: DateTime<Utc>,
    pub embedding_backend: String,
    pub embedding_model: Option<String>,
    pub dimension: usize,
    pub chunks: Vec<IndexedChunk>,
}

impl VectorIndex {
    /// Pair chunk texts with their embeddings.
    ///
    /// Fails with `BuildFailure` when the counts disagree or any vector does
    /// not match the dimension of the first one.
    pub fn new(
        video_id: impl Into<String>,
        texts: Vec<String>,
        embeddings: Vec<Vec<f32>>,
        embedding_backend: impl Into<String>,
        embedding_model: Option<String>,
    ) -> Result<Self, AppError> {
        if texts.len() != embeddings.len() {
            return Err(AppError::BuildFailure(format!(
                "received {} embeddings for {} chunks",
                embeddings.len(),
                texts.len()
            )));
        }

        let dimension = embeddings.first().map_or(0, Vec::len);
        if let Some(bad) = embeddings.iter().position(|e| e.len() != dimension) {
            return Err(AppError::BuildFailure(format!(
                "embedding {bad} has dimension {} but the index uses {dimension}",
                embeddings.get(bad).map_or(0, Vec::len)
            )));
        }

        let chunks = texts
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(position, (text, embedding))| IndexedChunk {
                position,
                text,
                embedding,
            })
            .collect();

        Ok(Self {
            format_version: INDEX_FORMAT_VERSION,
            video_id: video_id.into(),
            created_at: Utc::now(),
            embedding_backend: embedding_backend.into(),
            embedding_model,
            dimension,
            chunks,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Structural checks applied to an index read back from storage.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.format_version != INDEX_FORMAT_VERSION {
            return Err(AppError::Storage(format!(
                "unsupported index format version {} for {}",
                self.format_version, self.video_id
            )));
        }
        if let Some(chunk) = self
            .chunks
            .iter()
            .find(|chunk| chunk.embedding.len() != self.dimension)
        {
            return Err(AppError::Storage(format!(
                "chunk {} of {} has dimension {} but the index declares {}",
                chunk.position,
                self.video_id,
                chunk.embedding.len(),
                self.dimension
            )));
        }
        Ok(())
    }
}
