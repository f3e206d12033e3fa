mod config;
mod services;

pub use config::IngestionTuning;
#[allow(clippy::module_name_repetitions)]
pub use services::{DefaultPipelineServices, EmbeddingInfo, PipelineServices};

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use common::{
    error::AppError,
    storage::{
        index_store::IndexStore,
        types::vector_index::{IndexHandle, VectorIndex},
    },
    utils::embedding::EmbeddingProvider,
};
use tracing::{debug, info};

use crate::utils::transcript::TranscriptSource;

/// Builds a fresh index for a video: fetch, chunk, embed, construct, persist.
///
/// Any failing step aborts the build before anything is written, so the
/// store only ever sees complete indexes.
pub struct IndexBuilder {
    store: IndexStore,
    services: Arc<dyn PipelineServices>,
}

impl IndexBuilder {
    pub fn new(
        store: IndexStore,
        source: Arc<dyn TranscriptSource>,
        embedding_provider: Arc<EmbeddingProvider>,
        tuning: IngestionTuning,
    ) -> Self {
        let services = DefaultPipelineServices::new(source, embedding_provider, tuning);
        Self::with_services(store, Arc::new(services))
    }

    pub fn with_services(store: IndexStore, services: Arc<dyn PipelineServices>) -> Self {
        Self { store, services }
    }

    fn duration_millis(duration: Duration) -> u64 {
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
    }

    #[tracing::instrument(skip(self))]
    pub async fn build(&self, video_id: &str) -> Result<IndexHandle, AppError> {
        let pipeline_started = Instant::now();

        let stage_start = Instant::now();
        let transcript = self.services.fetch_content(video_id).await?;
        if transcript.trim().is_empty() {
            return Err(AppError::ContentUnavailable(format!(
                "transcript for {video_id} is empty"
            )));
        }
        let fetch_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let chunks = self.services.chunk_content(&transcript).await?;
        if chunks.is_empty() {
            return Err(AppError::ContentUnavailable(format!(
                "transcript for {video_id} produced no chunks"
            )));
        }
        let chunk_duration = stage_start.elapsed();
        debug!(
            transcript_chars = transcript.len(),
            chunk_count = chunks.len(),
            "transcript chunked"
        );

        let stage_start = Instant::now();
        let embeddings = self.services.embed_chunks(&chunks).await?;
        let embed_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let info = self.services.embedding_info();
        let index = VectorIndex::new(video_id, chunks, embeddings, info.backend, info.model)?;
        self.store.save(video_id, &index).await?;
        let persist_duration = stage_start.elapsed();

        info!(
            video_id,
            chunks = index.len(),
            dimension = index.dimension,
            total_ms = Self::duration_millis(pipeline_started.elapsed()),
            fetch_ms = Self::duration_millis(fetch_duration),
            chunk_ms = Self::duration_millis(chunk_duration),
            embed_ms = Self::duration_millis(embed_duration),
            persist_ms = Self::duration_millis(persist_duration),
            "index build completed"
        );

        Ok(Arc::new(index))
    }
}
