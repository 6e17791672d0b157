use std::sync::Arc;

use crate::config::{AppConfig, ConfigError, StoreBackend};
use crate::db;
use crate::services::{
    dates::{DateError, DateResolver},
    gateway::Gateway,
    job_store::{BrokeredJobStore, JobStore, MemoryJobStore, TerminalWritePolicy},
    llm::{GeminiModel, LlmError},
    orchestrator::{Orchestrator, TravelOrchestrator},
    queue::{Broker, JobQueue, QueueError},
    train_search::{SearchError, TrainSearchClient},
    weather::{OpenMeteoWeather, WeatherError},
};

/// Shared application state passed to all route handlers.
///
/// Built once per process by [`AppState::connect`] and torn down with
/// [`AppState::shutdown`].
#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
    pub store: Arc<dyn JobStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            gateway: Gateway::new(Arc::clone(&store)),
            store,
        }
    }

    /// Open the configured job store.
    pub async fn connect(config: &AppConfig) -> Result<Self, StartupError> {
        let policy = TerminalWritePolicy::from_strict(config.strict_terminal_writes);

        let store: Arc<dyn JobStore> = match config.job_store {
            StoreBackend::Memory => {
                tracing::info!("Using in-memory job store");
                Arc::new(MemoryJobStore::new(policy))
            }
            StoreBackend::Redis => {
                tracing::info!("Connecting to PostgreSQL result backend");
                let pool = db::init_pool(config.require_result_backend_url()?).await?;

                tracing::info!("Running database migrations");
                db::run_migrations(&pool).await?;

                tracing::info!("Connecting to Redis job broker");
                let queue = JobQueue::new(config.require_broker_url()?)?;
                queue.health_check().await?;

                Arc::new(BrokeredJobStore::new(queue, pool, policy))
            }
        };

        Ok(Self::new(store))
    }

    pub async fn shutdown(&self) {
        self.store.close().await;
    }
}

/// Wire up the travel orchestration routine and its capabilities.
pub fn build_orchestrator(config: &AppConfig) -> Result<Arc<dyn Orchestrator>, StartupError> {
    let model = Arc::new(GeminiModel::new(
        config.require_gemini_api_key()?,
        &config.llm_model,
    )?);
    let search = Arc::new(TrainSearchClient::new(
        config.require_train_api_base_url()?,
        config.poll_policy(),
    )?);
    let weather = Arc::new(OpenMeteoWeather::new(
        &config.weather_api_base_url,
        &config.geocoding_api_base_url,
    )?);
    let dates = DateResolver::new(model.clone(), config.utc_offset_hours)?;

    Ok(Arc::new(TravelOrchestrator::new(
        model,
        search,
        weather,
        dates,
        &config.default_departure_station,
    )))
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Result backend error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Weather(#[from] WeatherError),

    #[error(transparent)]
    Date(#[from] DateError),
}
