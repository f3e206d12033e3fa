use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::api_state::ApiState;

const STORAGE_PROBE_LOCATION: &str = ".ready";

/// Readiness check: returns 200 if the index store is reachable, else 503.
pub async fn ready(State(state): State<ApiState>) -> impl IntoResponse {
    let cached_indexes = state.coordinator.cache().len();

    match state
        .coordinator
        .store()
        .storage()
        .exists(STORAGE_PROBE_LOCATION)
        .await
    {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "checks": { "storage": "ok" },
                "cached_indexes": cached_indexes
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "error",
                "checks": { "storage": "fail" },
                "cached_indexes": cached_indexes,
                "reason": e.to_string()
            })),
        ),
    }
}
