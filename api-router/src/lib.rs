use api_state::ApiState;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use cors::cors_layer;
use middleware_rate_limit::rate_limit;
use routes::{ask::ask, liveness::live, readiness::ready};

pub mod api_state;
mod cors;
pub mod error;
pub mod middleware_rate_limit;
mod routes;

/// Router for the question answering API
pub fn api_routes<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Health checks for k8s/systemd
    let health = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live));

    // Rate limited per client address
    let questions = Router::new()
        .route(
            "/ask",
            post(ask).layer(DefaultBodyLimit::max(app_state.config.ask_max_body_bytes)),
        )
        .route_layer(from_fn_with_state(app_state.clone(), rate_limit));

    health
        .merge(questions)
        .layer(cors_layer(&app_state.config))
}
