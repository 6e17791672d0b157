use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use srt_travel_agent::{
    app_state::{build_orchestrator, AppState},
    config::{AppConfig, StoreBackend},
    routes,
    services::worker::spawn_workers,
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing travel agent gateway");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);
    routes::metrics::describe_metrics();

    let state = AppState::connect(&config)
        .await
        .expect("Failed to initialize job store");

    if config.job_store == StoreBackend::Memory && config.embedded_workers == 0 {
        tracing::warn!("In-memory job store without EMBEDDED_WORKERS: jobs will never run");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let workers = if config.embedded_workers > 0 {
        tracing::info!(count = config.embedded_workers, "Starting embedded workers");
        let orchestrator =
            build_orchestrator(&config).expect("Failed to initialize orchestration routine");
        spawn_workers(
            config.embedded_workers,
            "embedded",
            Arc::clone(&state.store),
            orchestrator,
            config.worker_idle_interval(),
            shutdown_rx,
        )
    } else {
        Vec::new()
    };

    let app = routes::router(state.clone(), Some(prometheus_handle));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C signal");
            }
            tracing::info!("Received Ctrl-C, initiating graceful shutdown");
        })
        .await
        .expect("Server error");

    let _ = shutdown_tx.send(true);
    for handle in workers {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Embedded worker task failed");
        }
    }

    state.shutdown().await;
    tracing::info!("Gateway stopped");
}
