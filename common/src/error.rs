use async_openai::error::OpenAIError;
use thiserror::Error;
use tokio::task::JoinError;

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Content unavailable: {0}")]
    ContentUnavailable(String),
    #[error("Access denied: {0}")]
    AccessDenied(String),
    #[error("Index build failed: {0}")]
    BuildFailure(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),
    #[error("Upstream error: {0}")]
    TransientUpstream(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("OpenAI error: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("LLM parsing error: {0}")]
    LLMParsing(String),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl AppError {
    /// Whether a client may reasonably retry the same request later.
    ///
    /// Missing or blocked content and malformed input will never succeed on
    /// retry; everything else is an infrastructure hiccup.
    pub const fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::ContentUnavailable(_)
                | Self::AccessDenied(_)
                | Self::Validation(_)
                | Self::NotFound(_)
        )
    }
}
