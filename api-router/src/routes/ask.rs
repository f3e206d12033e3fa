use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use ingestion_pipeline::IngestionSource;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

const MAX_VIDEO_ID_LEN: usize = 64;

#[derive(Debug, Deserialize)]
pub struct AskParams {
    pub video_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub ingest: IngestionSource,
    pub video_id: String,
}

/// Video ids double as storage directory names, so only a conservative
/// character set is accepted.
fn validate_video_id(video_id: &str) -> Result<(), ApiError> {
    let valid_chars = video_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if video_id.is_empty() || video_id.len() > MAX_VIDEO_ID_LEN || !valid_chars {
        return Err(ApiError::ValidationError(format!(
            "video_id must be 1 to {MAX_VIDEO_ID_LEN} characters of letters, digits, '-' or '_'"
        )));
    }
    Ok(())
}

fn validate_question(question: &str, max_bytes: usize) -> Result<(), ApiError> {
    if question.trim().is_empty() {
        return Err(ApiError::ValidationError(
            "question must not be empty".to_string(),
        ));
    }
    if question.len() > max_bytes {
        return Err(ApiError::ValidationError(format!(
            "question exceeds {max_bytes} bytes"
        )));
    }
    Ok(())
}

pub async fn ask(
    State(state): State<ApiState>,
    query: Result<Query<AskParams>, QueryRejection>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = query?;
    let Json(request) = body?;
    validate_video_id(&params.video_id)?;
    validate_question(&request.question, state.config.ask_max_question_bytes)?;

    info!(
        video_id = %params.video_id,
        question_bytes = request.question.len(),
        "Received question"
    );

    let ingest = state.coordinator.ensure_ready(&params.video_id).await?;
    let index = state.coordinator.index(&params.video_id).ok_or_else(|| {
        ApiError::InternalError("index missing after ingestion".to_string())
    })?;

    let answer = state
        .query_engine
        .answer(&index, &request.question)
        .await?;

    Ok((
        StatusCode::OK,
        Json(AskResponse {
            answer,
            ingest,
            video_id: params.video_id,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_youtube_style_ids() {
        assert!(validate_video_id("abc123").is_ok());
        assert!(validate_video_id("dQw4w9WgXcQ").is_ok());
        assert!(validate_video_id("a-b_c").is_ok());
    }

    #[test]
    fn rejects_ids_that_are_not_safe_directory_names() {
        for bad in ["", "../etc", "a/b", "with space", "dot.ted", &"x".repeat(65)] {
            assert!(
                matches!(validate_video_id(bad), Err(ApiError::ValidationError(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn question_must_be_non_empty_and_bounded() {
        assert!(validate_question("What is this about?", 64).is_ok());
        assert!(validate_question("   ", 64).is_err());
        assert!(validate_question(&"q".repeat(65), 64).is_err());
    }
}
