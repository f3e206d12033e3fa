use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use common::{error::AppError, utils::embedding::EmbeddingProvider};
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    RetryIf,
};
use tracing::warn;

use super::config::IngestionTuning;
use crate::utils::{chunking::chunk_text, transcript::TranscriptSource};

const MAX_FETCH_BACKOFF: Duration = Duration::from_secs(5);

/// Describes the embedding model baked into an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingInfo {
    pub backend: String,
    pub model: Option<String>,
}

/// The external steps an index build is composed of.
#[async_trait]
pub trait PipelineServices: Send + Sync {
    async fn fetch_content(&self, video_id: &str) -> Result<String, AppError>;

    async fn chunk_content(&self, text: &str) -> Result<Vec<String>, AppError>;

    async fn embed_chunks(&self, chunks: &[String]) -> Result<Vec<Vec<f32>>, AppError>;

    fn embedding_info(&self) -> EmbeddingInfo;
}

pub struct DefaultPipelineServices {
    source: Arc<dyn TranscriptSource>,
    embedding_provider: Arc<EmbeddingProvider>,
    tuning: IngestionTuning,
}

impl DefaultPipelineServices {
    pub fn new(
        source: Arc<dyn TranscriptSource>,
        embedding_provider: Arc<EmbeddingProvider>,
        tuning: IngestionTuning,
    ) -> Self {
        Self {
            source,
            embedding_provider,
            tuning,
        }
    }
}

#[async_trait]
impl PipelineServices for DefaultPipelineServices {
    async fn fetch_content(&self, video_id: &str) -> Result<String, AppError> {
        let retries = self.tuning.fetch_attempts.saturating_sub(1);
        // Delays grow 2x, 4x, 8x ... the configured step.
        let retry_strategy = ExponentialBackoff::from_millis(2)
            .factor(self.tuning.fetch_backoff_step_ms)
            .max_delay(MAX_FETCH_BACKOFF)
            .map(jitter)
            .take(retries);

        RetryIf::spawn(
            retry_strategy,
            || self.source.fetch_transcript(video_id),
            |err: &AppError| {
                let transient = matches!(err, AppError::TransientUpstream(_));
                if transient {
                    warn!(video_id, error = %err, "transcript fetch failed; retrying");
                }
                transient
            },
        )
        .await
    }

    async fn chunk_content(&self, text: &str) -> Result<Vec<String>, AppError> {
        // Bad bounds are a server misconfiguration, not a bad request.
        chunk_text(text, self.tuning.chunk_size, self.tuning.chunk_overlap).map_err(|e| match e {
            AppError::Validation(msg) => AppError::BuildFailure(format!("chunking transcript: {msg}")),
            other => other,
        })
    }

    async fn embed_chunks(&self, chunks: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        let batch_size = self.tuning.embedding_batch_size.max(1);
        let mut embeddings = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(batch_size) {
            let vectors = self
                .embedding_provider
                .embed_batch(batch.to_vec())
                .await
                .map_err(|e| AppError::BuildFailure(format!("embedding transcript chunks: {e}")))?;
            embeddings.extend(vectors);
        }

        Ok(embeddings)
    }

    fn embedding_info(&self) -> EmbeddingInfo {
        EmbeddingInfo {
            backend: self.embedding_provider.backend_label().to_string(),
            model: self.embedding_provider.model_code(),
        }
    }
}
