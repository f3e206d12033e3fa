use api_router::{api_routes, api_state::ApiState};
use axum::{extract::FromRef, Router};
use common::{
    storage::{index_store::IndexStore, store::StorageManager},
    utils::{
        config::{get_config, AppConfig},
        embedding::EmbeddingProvider,
    },
};
use ingestion_pipeline::{
    IndexBuilder, IngestionCoordinator, IngestionTuning, YoutubeTranscriptSource,
};
use retrieval_pipeline::OpenAiQueryEngine;
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config
    let config = get_config()?;

    let app = build_app(&config).await?;

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Wire storage, providers, the ingestion coordinator and the query engine
/// into a ready-to-serve router.
async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let tuning = IngestionTuning::from_config(config)?;

    let openai_client = Arc::new(async_openai::Client::with_config(
        async_openai::config::OpenAIConfig::new()
            .with_api_key(&config.openai_api_key)
            .with_api_base(&config.openai_base_url),
    ));

    let embedding_provider =
        Arc::new(EmbeddingProvider::from_config(config, Some(openai_client.clone())).await?);
    info!(
        embedding_backend = ?config.embedding_backend,
        embedding_dimension = embedding_provider.dimension(),
        "Embedding provider initialized"
    );

    let storage = StorageManager::new(config).await?;
    info!(
        backend = ?storage.backend_kind(),
        base_path = ?storage.local_base_path(),
        "Index storage initialized"
    );
    let store = IndexStore::new(storage);

    let transcript_source = Arc::new(YoutubeTranscriptSource::from_config(config)?);
    let builder = Arc::new(IndexBuilder::new(
        store.clone(),
        transcript_source,
        embedding_provider.clone(),
        tuning,
    ));
    let coordinator = IngestionCoordinator::new(store, builder);

    let query_engine = Arc::new(OpenAiQueryEngine::from_config(
        config,
        openai_client,
        embedding_provider,
    ));

    let api_state = ApiState::new(config, coordinator, query_engine);

    Ok(Router::new()
        .merge(api_routes(&api_state))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { api_state }))
}

#[derive(Clone, FromRef)]
struct AppState {
    api_state: ApiState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use common::utils::config::{EmbeddingBackend, StorageKind};
    use std::path::Path;
    use tower::ServiceExt;

    fn smoke_test_config(store_dir: &Path, storage: StorageKind) -> AppConfig {
        AppConfig {
            openai_api_key: "test-key".into(),
            openai_base_url: "https://example.com".into(),
            store_dir: store_dir.to_string_lossy().into_owned(),
            http_port: 0,
            storage,
            // Use hashed embeddings for tests to avoid external dependencies
            embedding_backend: EmbeddingBackend::Hashed,
            embedding_dimensions: 64,
            ..Default::default()
        }
    }

    async fn assert_health_ok(app: Router) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/live")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);

        let ready_response = app
            .oneshot(
                Request::builder()
                    .uri("/ready")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("ready response");
        assert_eq!(ready_response.status(), StatusCode::OK);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn smoke_startup_with_in_memory_storage() {
        let config = smoke_test_config(Path::new("/tmp/unused"), StorageKind::Memory);

        let app = build_app(&config).await.expect("failed to build app");

        assert_health_ok(app).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn smoke_startup_with_local_storage() {
        let store_dir = tempfile::tempdir().expect("failed to create temp store directory");
        let config = smoke_test_config(store_dir.path(), StorageKind::Local);

        let app = build_app(&config).await.expect("failed to build app");

        assert_health_ok(app).await;
    }

    #[tokio::test]
    async fn startup_fails_on_overlap_not_below_chunk_size() {
        let mut config = smoke_test_config(Path::new("/tmp/unused"), StorageKind::Memory);
        config.chunk_size = 100;
        config.chunk_overlap = 200;

        let err = build_app(&config)
            .await
            .err()
            .expect("overlapping chunk settings must fail startup");

        assert!(err.to_string().contains("CHUNK_OVERLAP"), "{err}");
    }
}
