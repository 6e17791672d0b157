use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::app_state::AppState;
use crate::models::job::JobStatus;
use crate::models::submission::{ResultResponse, SubmitRequest, SubmitResponse};
use crate::services::gateway::GatewayError;

/// POST /submit (alias /invoke): enqueue a travel query.
pub async fn submit_query(
    State(state): State<AppState>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<Json<SubmitResponse>, ApiError> {
    // A missing or unreadable body is a validation error like any other.
    let Json(request) =
        body.map_err(|rejection| GatewayError::Validation(rejection.body_text()))?;
    let job_id = state.gateway.submit(&request).await?;

    Ok(Json(SubmitResponse {
        job_id,
        status: JobStatus::Pending,
    }))
}

/// GET /results/{job_id}: check a job's status and result.
pub async fn get_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<ResultResponse>, ApiError> {
    Ok(Json(state.gateway.get_status(&job_id).await?))
}

/// HTTP-facing error, rendered as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] GatewayError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            GatewayError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Store(e) => {
                tracing::error!(error = %e, "Job store unavailable");
                StatusCode::SERVICE_UNAVAILABLE
            }
        };

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
