use serde::Deserialize;
use std::time::Duration;

use crate::services::train_search::PollPolicy;

/// Which job store backs the gateway and workers.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Redis broker plus Postgres result backend.
    Redis,
    /// In-process store; only usable with embedded workers.
    Memory,
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Gateway bind address (e.g., "0.0.0.0:8000"). Optional for worker processes.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_job_store")]
    pub job_store: StoreBackend,

    /// Redis connection string for the job broker
    pub broker_url: Option<String>,

    /// PostgreSQL connection string for the result backend
    pub result_backend_url: Option<String>,

    /// Base URL of the external train search service
    pub train_api_base_url: Option<String>,

    /// Gemini API key for the language model
    pub gemini_api_key: Option<String>,

    #[serde(default = "default_llm_model")]
    pub llm_model: String,

    #[serde(default = "default_weather_api_base_url")]
    pub weather_api_base_url: String,

    #[serde(default = "default_geocoding_api_base_url")]
    pub geocoding_api_base_url: String,

    #[serde(default = "default_search_poll_attempts")]
    pub search_poll_attempts: u32,

    #[serde(default = "default_search_poll_interval_secs")]
    pub search_poll_interval_secs: u64,

    /// Claim loops per worker process
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    #[serde(default = "default_worker_idle_interval_ms")]
    pub worker_idle_interval_ms: u64,

    /// Claim loops hosted inside the gateway process
    #[serde(default)]
    pub embedded_workers: usize,

    /// Reject (rather than ignore) a second terminal write to a job
    #[serde(default)]
    pub strict_terminal_writes: bool,

    #[serde(default = "default_departure_station")]
    pub default_departure_station: String,

    /// Offset used to decide what "today" is when resolving relative dates
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_job_store() -> StoreBackend {
    StoreBackend::Redis
}

fn default_llm_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}

fn default_weather_api_base_url() -> String {
    "https://api.open-meteo.com".to_string()
}

fn default_geocoding_api_base_url() -> String {
    "https://geocoding-api.open-meteo.com".to_string()
}

fn default_search_poll_attempts() -> u32 {
    8
}

fn default_search_poll_interval_secs() -> u64 {
    5
}

fn default_worker_concurrency() -> usize {
    1
}

fn default_worker_idle_interval_ms() -> u64 {
    1000
}

fn default_departure_station() -> String {
    "수서".to_string()
}

fn default_utc_offset_hours() -> i32 {
    9
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Ok(envy::from_env()?)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            max_attempts: self.search_poll_attempts,
            interval: Duration::from_secs(self.search_poll_interval_secs),
        }
    }

    pub fn worker_idle_interval(&self) -> Duration {
        Duration::from_millis(self.worker_idle_interval_ms)
    }

    pub fn require_broker_url(&self) -> Result<&str, ConfigError> {
        require(&self.broker_url, "BROKER_URL")
    }

    pub fn require_result_backend_url(&self) -> Result<&str, ConfigError> {
        require(&self.result_backend_url, "RESULT_BACKEND_URL")
    }

    pub fn require_train_api_base_url(&self) -> Result<&str, ConfigError> {
        require(&self.train_api_base_url, "TRAIN_API_BASE_URL")
    }

    pub fn require_gemini_api_key(&self) -> Result<&str, ConfigError> {
        require(&self.gemini_api_key, "GEMINI_API_KEY")
    }
}

fn require<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Missing required setting {0}")]
    Missing(&'static str),
}
