//! Test helper utilities: scripted capabilities and HTTP polling helpers

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;
use uuid::Uuid;

use srt_travel_agent::models::job::{Job, JobStatus};
use srt_travel_agent::models::submission::{ResultResponse, SubmitResponse};
use srt_travel_agent::models::train::{RemoteSearchResult, SearchJobId, SearchRequest};
use srt_travel_agent::services::dates::DateResolver;
use srt_travel_agent::services::job_store::{JobStore, MemoryJobStore, StoreError};
use srt_travel_agent::services::llm::{LanguageModel, LlmError};
use srt_travel_agent::services::orchestrator::{
    OrchestrationError, Orchestrator, TravelOrchestrator,
};
use srt_travel_agent::services::train_search::{PollPolicy, SearchApi, SearchError};
use srt_travel_agent::services::weather::{WeatherError, WeatherLookup};

/// Language model that answers by recognising which prompt it was given.
pub struct ScriptedModel {
    pub extraction: String,
    /// `None` makes the listing prompt fail.
    pub listing: Option<String>,
    pub weather_summary: String,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn busan_tomorrow() -> Self {
        Self {
            extraction: r#"{"dep_station": null, "arr_station": "부산", "date": "내일"}"#
                .to_string(),
            listing: Some(
                "## ✅ 예매 가능\n* **08:00** 출발 (301) → 10:30 도착 (일반석 가능)".to_string(),
            ),
            weather_summary: "부산의 내일 날씨는 맑고 기온은 15도에서 25도 사이입니다.".to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if prompt.contains("추출") {
            Ok(self.extraction.clone())
        } else if prompt.contains("열차 조회 결과") {
            self.listing.clone().ok_or(LlmError::EmptyResponse)
        } else if prompt.contains("날씨 정보를") {
            Ok(self.weather_summary.clone())
        } else {
            Err(LlmError::EmptyResponse)
        }
    }
}

/// Search service replaying a fixed list of remote statuses.
pub struct FakeSearch {
    pub start_fails: bool,
    pub statuses: Mutex<VecDeque<(String, Value)>>,
    pub requests: Mutex<Vec<SearchRequest>>,
    pub polls: AtomicU32,
}

impl FakeSearch {
    pub fn with_statuses(statuses: Vec<(&str, Value)>) -> Self {
        Self {
            start_fails: false,
            statuses: Mutex::new(
                statuses
                    .into_iter()
                    .map(|(s, v)| (s.to_string(), v))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
            polls: AtomicU32::new(0),
        }
    }

    pub fn completed(data: Value) -> Self {
        Self::with_statuses(vec![("PENDING", Value::Null), ("COMPLETED", data)])
    }

    pub fn failing_start() -> Self {
        Self {
            start_fails: true,
            ..Self::with_statuses(Vec::new())
        }
    }

    pub fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchApi for FakeSearch {
    async fn start_search(&self, request: &SearchRequest) -> Result<SearchJobId, SearchError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.start_fails {
            return Err(SearchError::EmptyJobId);
        }
        Ok(SearchJobId::new("remote-job-1").unwrap())
    }

    fn poll_policy(&self) -> PollPolicy {
        fast_policy()
    }

    async fn fetch_result(&self, _job_id: &SearchJobId) -> Result<RemoteSearchResult, SearchError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let next = self.statuses.lock().unwrap().pop_front();
        let (status, data) = next.unwrap_or_else(|| ("PENDING".to_string(), Value::Null));
        Ok(RemoteSearchResult { status, data })
    }
}

/// Weather lookup returning a canned report, or failing.
pub struct FixedWeather(pub Option<&'static str>);

#[async_trait]
impl WeatherLookup for FixedWeather {
    async fn lookup_weather(&self, city: &str, _date: NaiveDate) -> Result<String, WeatherError> {
        match self.0 {
            Some(report) => Ok(report.to_string()),
            None => Err(WeatherError::UnknownCity(city.to_string())),
        }
    }
}

/// Memory store whose next `terminal_failures` terminal writes fail with a
/// backend timeout.
pub struct FlakyStore {
    pub inner: MemoryJobStore,
    pub terminal_failures: AtomicU32,
    pub terminal_writes: AtomicU32,
}

impl FlakyStore {
    pub fn failing_terminal_writes(n: u32) -> Self {
        Self {
            inner: MemoryJobStore::default(),
            terminal_failures: AtomicU32::new(n),
            terminal_writes: AtomicU32::new(0),
        }
    }

    pub fn terminal_writes(&self) -> u32 {
        self.terminal_writes.load(Ordering::SeqCst)
    }

    fn trip(&self) -> Result<(), StoreError> {
        self.terminal_writes.fetch_add(1, Ordering::SeqCst);
        let remaining = self.terminal_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.terminal_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl JobStore for FlakyStore {
    async fn enqueue(&self, payload: &str) -> Result<Uuid, StoreError> {
        self.inner.enqueue(payload).await
    }

    async fn claim_next(&self) -> Result<Option<Job>, StoreError> {
        self.inner.claim_next().await
    }

    async fn complete(&self, job_id: Uuid, result: &str) -> Result<bool, StoreError> {
        self.trip()?;
        self.inner.complete(job_id, result).await
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<bool, StoreError> {
        self.trip()?;
        self.inner.fail(job_id, error).await
    }

    async fn get(&self, job_id: Uuid) -> Result<Job, StoreError> {
        self.inner.get(job_id).await
    }

    async fn queue_depth(&self) -> Result<u64, StoreError> {
        self.inner.queue_depth().await
    }

    async fn count(&self, status: JobStatus) -> Result<u64, StoreError> {
        self.inner.count(status).await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.inner.health_check().await
    }
}

/// Orchestrator that always panics.
pub struct PanickingOrchestrator;

#[async_trait]
impl Orchestrator for PanickingOrchestrator {
    async fn run(&self, _query: &str) -> Result<String, OrchestrationError> {
        panic!("model client exploded");
    }
}

/// Orchestrator that echoes the query back, or fails on "fail".
pub struct EchoOrchestrator;

#[async_trait]
impl Orchestrator for EchoOrchestrator {
    async fn run(&self, query: &str) -> Result<String, OrchestrationError> {
        if query == "fail" {
            return Err(OrchestrationError::MissingArrival);
        }
        Ok(format!("answer: {}", query))
    }
}

pub fn fast_policy() -> PollPolicy {
    PollPolicy {
        max_attempts: 3,
        interval: Duration::from_millis(5),
    }
}

pub fn travel_orchestrator(
    model: Arc<ScriptedModel>,
    search: Arc<FakeSearch>,
    weather: FixedWeather,
) -> TravelOrchestrator {
    let dates = DateResolver::new(model.clone(), 9).unwrap();
    TravelOrchestrator::new(
        model,
        search,
        Arc::new(weather),
        dates,
        "수서",
    )
}

/// Submit a query to a running gateway
pub async fn submit_query(
    client: &reqwest::Client,
    base_url: &str,
    query: &str,
) -> Result<SubmitResponse, Box<dyn std::error::Error>> {
    let response = client
        .post(format!("{}/submit", base_url))
        .json(&serde_json::json!({ "query": query }))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await?;
        return Err(format!("Submit failed with status {}: {}", status, error_text).into());
    }

    Ok(response.json::<SubmitResponse>().await?)
}

/// Poll job status until it is terminal (with timeout)
pub async fn poll_job_status(
    client: &reqwest::Client,
    base_url: &str,
    job_id: &str,
    timeout_secs: u64,
) -> Result<ResultResponse, Box<dyn std::error::Error>> {
    let max_attempts = timeout_secs * 2; // Poll every 500ms

    for attempt in 0..max_attempts {
        let response = client
            .get(format!("{}/results/{}", base_url, job_id))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(format!("Status check failed: {}", error_text).into());
        }

        let status_response = response.json::<ResultResponse>().await?;
        if status_response.status.is_terminal() {
            return Ok(status_response);
        }

        if attempt % 10 == 0 && attempt > 0 {
            println!("  ... still waiting (attempt {}/{})", attempt, max_attempts);
        }
        sleep(Duration::from_millis(500)).await;
    }

    Err(format!("Job did not complete within {} seconds", timeout_secs).into())
}
