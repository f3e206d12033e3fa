use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Answers as long as the server loop is alive. Never touches storage or the
/// ingestion cache, so a long build cannot make the process look dead.
pub async fn live() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
