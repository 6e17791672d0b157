//! External SRT seat-availability search client.
//!
//! The search service is itself asynchronous: starting a search returns a
//! job handle, and the result has to be polled until the remote side
//! reports `COMPLETED` or `ERROR`.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;

use crate::models::train::{
    data_to_text, RemoteSearchResult, RemoteStatus, SearchJobId, SearchOutcome, SearchRequest,
    SearchStarted,
};

/// Attempt budget for polling a remote search job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            interval: Duration::from_secs(5),
        }
    }
}

impl PollPolicy {
    /// Nominal wait covered by the whole budget.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// The two calls the external search service offers, plus the poll loop
/// built on them.
#[async_trait]
pub trait SearchApi: Send + Sync {
    async fn start_search(&self, request: &SearchRequest) -> Result<SearchJobId, SearchError>;

    async fn fetch_result(&self, job_id: &SearchJobId) -> Result<RemoteSearchResult, SearchError>;

    fn poll_policy(&self) -> PollPolicy {
        PollPolicy::default()
    }

    /// Poll a started search under [`SearchApi::poll_policy`].
    async fn poll_result(&self, job_id: &SearchJobId) -> SearchOutcome {
        poll_until_terminal(self, job_id, &self.poll_policy()).await
    }
}

/// Poll `job_id` until the remote status is terminal or the budget runs out.
///
/// Sleeps `policy.interval` between attempts, never after the last one.
/// A transport failure on any attempt ends the loop immediately.
pub async fn poll_until_terminal<A>(api: &A, job_id: &SearchJobId, policy: &PollPolicy) -> SearchOutcome
where
    A: SearchApi + ?Sized,
{
    for attempt in 1..=policy.max_attempts {
        let result = match api.fetch_result(job_id).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(
                    search_job_id = %job_id,
                    attempt,
                    error = %e,
                    "Search poll failed"
                );
                metrics::histogram!("train_search_poll_attempts").record(attempt as f64);
                return SearchOutcome::Transport(e.to_string());
            }
        };

        match RemoteStatus::parse(&result.status) {
            RemoteStatus::Completed => {
                tracing::info!(search_job_id = %job_id, attempt, "Search completed");
                metrics::histogram!("train_search_poll_attempts").record(attempt as f64);
                return SearchOutcome::Completed(result.data);
            }
            RemoteStatus::Error => {
                tracing::warn!(search_job_id = %job_id, attempt, "Search reported an error");
                metrics::histogram!("train_search_poll_attempts").record(attempt as f64);
                return SearchOutcome::RemoteError(data_to_text(&result.data));
            }
            RemoteStatus::Pending(status) => {
                tracing::debug!(
                    search_job_id = %job_id,
                    attempt,
                    status = %status,
                    "Search still pending"
                );
            }
        }

        if attempt < policy.max_attempts {
            sleep(policy.interval).await;
        }
    }

    tracing::warn!(
        search_job_id = %job_id,
        attempts = policy.max_attempts,
        "Search timed out"
    );
    metrics::histogram!("train_search_poll_attempts").record(policy.max_attempts as f64);
    SearchOutcome::TimedOut {
        attempts: policy.max_attempts,
        budget: policy.budget(),
    }
}

/// HTTP client for the train search service.
pub struct TrainSearchClient {
    http: reqwest::Client,
    base_url: String,
    policy: PollPolicy,
}

impl TrainSearchClient {
    pub fn new(base_url: &str, policy: PollPolicy) -> Result<Self, SearchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy,
        })
    }

}

#[async_trait]
impl SearchApi for TrainSearchClient {
    async fn start_search(&self, request: &SearchRequest) -> Result<SearchJobId, SearchError> {
        let url = format!("{}/api/v1/search/check-seat-availability", self.base_url);

        let started: SearchStarted = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let job_id = SearchJobId::new(started.result_id).ok_or(SearchError::EmptyJobId)?;
        tracing::info!(
            search_job_id = %job_id,
            dep_station = %request.dep_station,
            arr_station = %request.arr_station,
            dep_date = %request.dep_date,
            "Train search requested"
        );
        Ok(job_id)
    }

    fn poll_policy(&self) -> PollPolicy {
        self.policy
    }

    async fn fetch_result(&self, job_id: &SearchJobId) -> Result<RemoteSearchResult, SearchError> {
        let url = format!("{}/api/v1/search/results/{}", self.base_url, job_id);

        let result = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(result)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("HTTP request to train search service failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Train search service returned an empty job id")]
    EmptyJobId,
}
