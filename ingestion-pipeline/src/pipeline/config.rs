use common::{error::AppError, utils::config::AppConfig};

#[derive(Debug, Clone)]
pub struct IngestionTuning {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding_batch_size: usize,
    /// Total fetch attempts, including the first one.
    pub fetch_attempts: usize,
    pub fetch_backoff_step_ms: u64,
}

impl Default for IngestionTuning {
    fn default() -> Self {
        Self {
            chunk_size: 1_000,
            chunk_overlap: 200,
            embedding_batch_size: 64,
            fetch_attempts: 3,
            fetch_backoff_step_ms: 100,
        }
    }
}

impl IngestionTuning {
    /// Tuning taken from the service config, rejected up front when the
    /// chunk bounds could never produce a valid split.
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let tuning = Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            ..Self::default()
        };
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.chunk_size == 0 {
            return Err(AppError::Validation(
                "CHUNK_SIZE must be greater than zero".into(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::Validation(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.fetch_attempts == 0 {
            return Err(AppError::Validation(
                "at least one transcript fetch attempt is required".into(),
            ));
        }
        Ok(())
    }
}
