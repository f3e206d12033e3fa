use axum::http::{header, HeaderValue, Method};
use common::utils::config::AppConfig;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// CORS for the browser extension client. Origins come from
/// `cors_allowed_origins`; `*` opens the API to any origin.
pub fn cors_layer(config: &AppConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let origins = config.cors_origins();
    if origins.iter().any(|origin| origin == "*") {
        return cors.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    cors.allow_origin(allowed)
}
