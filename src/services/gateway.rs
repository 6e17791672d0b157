use garde::Validate;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::job::JobStatus;
use crate::models::submission::{ResultResponse, SubmitRequest, PENDING_PLACEHOLDER};
use crate::services::job_store::{JobStore, StoreError};

/// Client-facing boundary: accept queries, report their progress.
///
/// Never waits for a job to run; it only writes new jobs and reads state.
#[derive(Clone)]
pub struct Gateway {
    store: Arc<dyn JobStore>,
}

impl Gateway {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Validate and enqueue a query, returning its job id immediately.
    pub async fn submit(&self, request: &SubmitRequest) -> Result<Uuid, GatewayError> {
        request
            .validate()
            .map_err(|report| GatewayError::Validation(report.to_string()))?;

        let job_id = self.store.enqueue(request.query.trim()).await?;
        metrics::counter!("travel_jobs_submitted_total").increment(1);
        tracing::info!(job_id = %job_id, "Travel query submitted");
        Ok(job_id)
    }

    /// Look up a job. Ids that are not UUIDs are reported as unknown.
    pub async fn get_status(&self, raw_job_id: &str) -> Result<ResultResponse, GatewayError> {
        let job_id = Uuid::parse_str(raw_job_id.trim())
            .map_err(|_| GatewayError::NotFound(raw_job_id.to_string()))?;

        let job = match self.store.get(job_id).await {
            Ok(job) => job,
            Err(StoreError::NotFound(_)) => {
                return Err(GatewayError::NotFound(raw_job_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let result = if job.status.is_terminal() {
            job.result.unwrap_or_default()
        } else {
            PENDING_PLACEHOLDER.to_string()
        };

        Ok(ResultResponse {
            job_id: job.id,
            status: job.status,
            result,
        })
    }

    /// Refresh the queue depth gauge and report it.
    pub async fn queue_depth(&self) -> Result<u64, GatewayError> {
        let depth = self.store.queue_depth().await?;
        metrics::gauge!("travel_queue_depth").set(depth as f64);
        Ok(depth)
    }

    pub async fn running_jobs(&self) -> Result<u64, GatewayError> {
        Ok(self.store.count(JobStatus::Running).await?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Invalid submission: {0}")]
    Validation(String),

    #[error("Job {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
