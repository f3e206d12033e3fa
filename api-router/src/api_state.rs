use std::sync::Arc;

use common::utils::config::AppConfig;
use ingestion_pipeline::IngestionCoordinator;
use retrieval_pipeline::QueryEngine;

use crate::middleware_rate_limit::AskRateLimiter;

#[derive(Clone)]
pub struct ApiState {
    pub config: AppConfig,
    pub coordinator: IngestionCoordinator,
    pub query_engine: Arc<dyn QueryEngine>,
    pub rate_limiter: Arc<AskRateLimiter>,
}

impl ApiState {
    pub fn new(
        config: &AppConfig,
        coordinator: IngestionCoordinator,
        query_engine: Arc<dyn QueryEngine>,
    ) -> Self {
        Self {
            config: config.clone(),
            coordinator,
            query_engine,
            rate_limiter: Arc::new(AskRateLimiter::per_hour(config.ask_rate_limit_per_hour)),
        }
    }
}
