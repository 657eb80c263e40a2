//! Chain projection indexer.
//!
//! Feeds chain-sync instructions to the UTxO-set and order-book projectors,
//! with structured logging (tracing), Prometheus metrics and a health
//! endpoint reporting how far each projection has got.

pub mod config;
pub mod error;
pub mod feed;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use projection_store::{InMemoryProjectionStore, PostgresProjectionStore, ProjectionStore};
use projections::{ChainSyncProcessor, OrderBookProjector, ProjectionConfig, UtxoProjector};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use error::{IndexerError, Result};

/// Shared state behind the HTTP routes and the feed.
pub struct IndexerState {
    pub processor: ChainSyncProcessor,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<IndexerState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(routes::metrics::MetricsState {
            handle: metrics_handle,
            indexer: state.clone(),
        });

    Router::new()
        .route("/health", get(routes::health::check))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Registers both projectors over `store`.
pub fn create_processor<S>(store: S, projection_config: &ProjectionConfig) -> ChainSyncProcessor
where
    S: ProjectionStore + Clone + 'static,
{
    let mut processor = ChainSyncProcessor::new();
    processor.register(Box::new(UtxoProjector::new(store.clone())));
    processor.register(Box::new(OrderBookProjector::new(store, projection_config)));
    processor
}

/// Opens the configured store and builds the indexer state over it.
///
/// With a database URL the schema is migrated before use; without one the
/// projections live in memory for the lifetime of the process.
pub async fn create_state(
    config: &Config,
    projection_config: &ProjectionConfig,
) -> Result<Arc<IndexerState>> {
    let processor = match &config.database_url {
        Some(url) => {
            let store = PostgresProjectionStore::connect(url).await?;
            store.run_migrations().await?;
            tracing::info!("using PostgreSQL projection store");
            create_processor(store, projection_config)
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory projection store");
            create_processor(InMemoryProjectionStore::new(), projection_config)
        }
    };

    Ok(Arc::new(IndexerState { processor }))
}
