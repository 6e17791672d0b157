use srt_travel_agent::{
    app_state::{build_orchestrator, AppState},
    config::{AppConfig, StoreBackend},
    routes::metrics::describe_metrics,
    services::worker::spawn_workers,
};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting travel agent worker");

    // Load configuration
    let config = AppConfig::from_env().expect("Failed to load configuration");

    if config.job_store == StoreBackend::Memory {
        // A separate process cannot see the gateway's in-memory jobs.
        tracing::error!("JOB_STORE=memory requires EMBEDDED_WORKERS on the gateway, not a worker process");
        std::process::exit(1);
    }

    describe_metrics();

    let state = AppState::connect(&config)
        .await
        .expect("Failed to initialize job store");

    tracing::info!("Initializing orchestration routine");
    let orchestrator =
        build_orchestrator(&config).expect("Failed to initialize orchestration routine");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let workers = spawn_workers(
        config.worker_concurrency.max(1),
        "worker",
        state.store.clone(),
        orchestrator,
        config.worker_idle_interval(),
        shutdown_rx,
    );

    tracing::info!(
        concurrency = config.worker_concurrency.max(1),
        "Worker ready, waiting for jobs"
    );

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl-C, finishing in-flight jobs"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C signal"),
    }

    let _ = shutdown_tx.send(true);
    for handle in workers {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Worker task failed");
        }
    }

    state.shutdown().await;
    tracing::info!("Worker stopped");
}
