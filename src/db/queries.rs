use sqlx::{postgres::PgRow, PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::job::{Job, JobStatus};

const JOB_COLUMNS: &str =
    "id, payload, status, result, created_at, updated_at, started_at, finished_at";

fn row_to_job(row: &PgRow) -> Result<Job, sqlx::Error> {
    let status_str: String = row.try_get("status")?;
    let status = JobStatus::from_str(&status_str).map_err(|e| sqlx::Error::ColumnDecode {
        index: "status".to_string(),
        source: Box::new(e),
    })?;

    Ok(Job {
        id: row.try_get("id")?,
        payload: row.try_get("payload")?,
        status,
        result: row.try_get("result")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        started_at: row.try_get("started_at")?,
        finished_at: row.try_get("finished_at")?,
    })
}

/// Insert a new pending job
pub async fn insert_job(pool: &PgPool, job: &Job) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO travel_jobs (id, payload, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(job.id)
    .bind(&job.payload)
    .bind(job.status.to_string())
    .bind(job.created_at)
    .bind(job.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a job by ID
pub async fn get_job(pool: &PgPool, job_id: Uuid) -> Result<Option<Job>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM travel_jobs WHERE id = $1",
        JOB_COLUMNS
    ))
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_job).transpose()
}

/// Move a job from PENDING to RUNNING.
///
/// Returns `None` when the row is missing or no longer pending, so two
/// workers can never both win the same job.
pub async fn mark_running(pool: &PgPool, job_id: Uuid) -> Result<Option<Job>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        UPDATE travel_jobs
        SET status = 'RUNNING',
            started_at = NOW(),
            updated_at = NOW()
        WHERE id = $1 AND status = 'PENDING'
        RETURNING {}
        "#,
        JOB_COLUMNS
    ))
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_job).transpose()
}

/// Record a terminal state for a RUNNING job.
///
/// Returns `None` when the row is missing or not running; the caller
/// decides whether that is a duplicate write or an error.
pub async fn finish_job(
    pool: &PgPool,
    job_id: Uuid,
    status: JobStatus,
    result: &str,
) -> Result<Option<Job>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        UPDATE travel_jobs
        SET status = $2,
            result = $3,
            finished_at = NOW(),
            updated_at = NOW()
        WHERE id = $1 AND status = 'RUNNING'
        RETURNING {}
        "#,
        JOB_COLUMNS
    ))
    .bind(job_id)
    .bind(status.to_string())
    .bind(result)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_job).transpose()
}

/// Count jobs in a given status
pub async fn count_by_status(pool: &PgPool, status: JobStatus) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM travel_jobs WHERE status = $1")
        .bind(status.to_string())
        .fetch_one(pool)
        .await?;

    row.try_get("count")
}
