use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::job::JobStatus;

/// Placeholder returned in place of a result while a job is not terminal.
pub const PENDING_PLACEHOLDER: &str = "Agent is still working...";

/// Request body for `POST /submit` and `POST /invoke`.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitRequest {
    #[serde(alias = "payload")]
    #[garde(length(chars, min = 1, max = 2000), custom(not_blank))]
    pub query: String,
}

fn not_blank(value: &str, _ctx: &()) -> garde::Result {
    if value.trim().is_empty() {
        return Err(garde::Error::new("query must not be blank"));
    }
    Ok(())
}

/// Response after a query has been accepted.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}

/// Response for `GET /results/{job_id}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResultResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub result: String,
}
