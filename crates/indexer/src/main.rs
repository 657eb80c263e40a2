//! Indexer entry point.
//!
//! Serves `/health` and `/metrics` while applying the chain events piped in
//! on stdin.

use indexer::Config;
use projections::ProjectionConfig;
use tokio::io::BufReader;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Open the projection store and register the projectors
    let projection_config = ProjectionConfig::from_env().expect("invalid projection config");
    let state = indexer::create_state(&config, &projection_config)
        .await
        .expect("failed to open projection store");
    for (name, slot) in state
        .processor
        .positions()
        .await
        .expect("failed to read projection checkpoints")
    {
        tracing::info!(projection = name, slot = ?slot, "resuming projection");
    }

    // 4. Start server
    let app = indexer::create_app(state.clone(), metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, "starting indexer");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    // 5. Apply the chain-event feed; the server keeps running afterwards
    let stdin = BufReader::new(tokio::io::stdin());
    if let Err(error) = indexer::feed::run(stdin, &state.processor).await {
        tracing::error!(%error, "chain-event feed failed");
        std::process::exit(1);
    }

    server
        .await
        .expect("server task panicked")
        .expect("server error");

    tracing::info!("indexer shut down gracefully");
}
