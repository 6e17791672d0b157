//! Job store and broker.
//!
//! A [`JobStore`] owns every job record. It hands each pending job to
//! exactly one worker and accepts a single terminal write per job.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::queries;
use crate::models::job::{Job, JobStatus};
use crate::services::queue::{Broker, QueueError};

/// What happens when a job that is already terminal receives another
/// terminal write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminalWritePolicy {
    /// Keep the first result, log the duplicate, report `Ok(false)`.
    #[default]
    IgnoreDuplicate,
    /// Report `StoreError::InvalidTransition`.
    Reject,
}

impl TerminalWritePolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            TerminalWritePolicy::Reject
        } else {
            TerminalWritePolicy::IgnoreDuplicate
        }
    }
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new `PENDING` job and make it visible to workers.
    async fn enqueue(&self, payload: &str) -> Result<Uuid, StoreError>;

    /// Atomically move one pending job to `RUNNING` and return it.
    async fn claim_next(&self) -> Result<Option<Job>, StoreError>;

    /// `RUNNING -> SUCCESS`. `Ok(false)` means a duplicate write was ignored.
    async fn complete(&self, job_id: Uuid, result: &str) -> Result<bool, StoreError>;

    /// `RUNNING -> FAILURE`. `Ok(false)` means a duplicate write was ignored.
    async fn fail(&self, job_id: Uuid, error: &str) -> Result<bool, StoreError>;

    async fn get(&self, job_id: Uuid) -> Result<Job, StoreError>;

    /// Jobs waiting to be claimed.
    async fn queue_depth(&self) -> Result<u64, StoreError>;

    async fn count(&self, status: JobStatus) -> Result<u64, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;

    /// Release connections. Called once at process shutdown.
    async fn close(&self) {}
}

/// Decide the outcome of a terminal write that found the job in `current`.
fn rejected_terminal_write(
    job_id: Uuid,
    current: JobStatus,
    target: JobStatus,
    policy: TerminalWritePolicy,
) -> Result<bool, StoreError> {
    if current.is_terminal() && policy == TerminalWritePolicy::IgnoreDuplicate {
        tracing::warn!(
            job_id = %job_id,
            current = %current,
            attempted = %target,
            "Ignoring duplicate terminal write"
        );
        return Ok(false);
    }
    Err(StoreError::InvalidTransition {
        job_id,
        from: current,
        to: target,
    })
}

#[derive(Default)]
struct MemoryState {
    jobs: HashMap<Uuid, Job>,
    pending: VecDeque<Uuid>,
}

/// In-process job store. Every operation runs under one lock.
#[derive(Default)]
pub struct MemoryJobStore {
    state: Mutex<MemoryState>,
    policy: TerminalWritePolicy,
}

impl MemoryJobStore {
    pub fn new(policy: TerminalWritePolicy) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            policy,
        }
    }

    async fn finish(
        &self,
        job_id: Uuid,
        target: JobStatus,
        text: &str,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let job = state
            .jobs
            .get_mut(&job_id)
            .ok_or(StoreError::NotFound(job_id))?;

        if !job.status.can_transition_to(target) {
            return rejected_terminal_write(job_id, job.status, target, self.policy);
        }

        let now = Utc::now();
        job.status = target;
        job.result = Some(text.to_string());
        job.updated_at = now;
        job.finished_at = Some(now);
        Ok(true)
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn enqueue(&self, payload: &str) -> Result<Uuid, StoreError> {
        let mut state = self.state.lock().await;
        let mut job = Job::new(payload);
        while state.jobs.contains_key(&job.id) {
            job.id = Uuid::new_v4();
        }
        let id = job.id;
        state.jobs.insert(id, job);
        state.pending.push_back(id);
        Ok(id)
    }

    async fn claim_next(&self) -> Result<Option<Job>, StoreError> {
        let mut state = self.state.lock().await;
        while let Some(id) = state.pending.pop_front() {
            let Some(job) = state.jobs.get_mut(&id) else {
                continue;
            };
            if job.status != JobStatus::Pending {
                continue;
            }
            let now = Utc::now();
            job.status = JobStatus::Running;
            job.started_at = Some(now);
            job.updated_at = now;
            return Ok(Some(job.clone()));
        }
        Ok(None)
    }

    async fn complete(&self, job_id: Uuid, result: &str) -> Result<bool, StoreError> {
        self.finish(job_id, JobStatus::Success, result).await
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<bool, StoreError> {
        self.finish(job_id, JobStatus::Failure, error).await
    }

    async fn get(&self, job_id: Uuid) -> Result<Job, StoreError> {
        let state = self.state.lock().await;
        state
            .jobs
            .get(&job_id)
            .cloned()
            .ok_or(StoreError::NotFound(job_id))
    }

    async fn queue_depth(&self) -> Result<u64, StoreError> {
        Ok(self.state.lock().await.pending.len() as u64)
    }

    async fn count(&self, status: JobStatus) -> Result<u64, StoreError> {
        let state = self.state.lock().await;
        Ok(state.jobs.values().filter(|j| j.status == status).count() as u64)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Redis broker in front of a Postgres result backend.
///
/// Redis decides which worker receives an id; the guarded `UPDATE`s in
/// [`queries`] decide whether a status change is legal.
pub struct BrokeredJobStore {
    queue: Box<dyn Broker>,
    db: PgPool,
    policy: TerminalWritePolicy,
}

impl BrokeredJobStore {
    pub fn new(queue: impl Broker + 'static, db: PgPool, policy: TerminalWritePolicy) -> Self {
        Self {
            queue: Box::new(queue),
            db,
            policy,
        }
    }

    async fn finish(
        &self,
        job_id: Uuid,
        target: JobStatus,
        text: &str,
    ) -> Result<bool, StoreError> {
        match queries::finish_job(&self.db, job_id, target, text).await? {
            Some(_) => {
                self.queue.complete(job_id).await?;
                Ok(true)
            }
            None => {
                let current = queries::get_job(&self.db, job_id)
                    .await?
                    .ok_or(StoreError::NotFound(job_id))?;
                rejected_terminal_write(job_id, current.status, target, self.policy)
            }
        }
    }
}

#[async_trait]
impl JobStore for BrokeredJobStore {
    async fn enqueue(&self, payload: &str) -> Result<Uuid, StoreError> {
        let job = Job::new(payload);
        queries::insert_job(&self.db, &job).await?;
        self.queue.enqueue(job.id).await?;
        Ok(job.id)
    }

    async fn claim_next(&self) -> Result<Option<Job>, StoreError> {
        while let Some(job_id) = self.queue.dequeue().await? {
            match queries::mark_running(&self.db, job_id).await {
                Ok(Some(job)) => return Ok(Some(job)),
                Ok(None) => {
                    // Stale or duplicate id: the row is gone or already past PENDING.
                    tracing::warn!(job_id = %job_id, "Dropping broker entry for non-pending job");
                    self.queue.complete(job_id).await?;
                }
                Err(e) => {
                    // The row is still PENDING; give the id back or nobody will claim it.
                    if let Err(requeue_error) = self.queue.requeue(job_id).await {
                        tracing::error!(
                            job_id = %job_id,
                            error = %requeue_error,
                            "Failed to requeue job after claim error"
                        );
                    }
                    return Err(e.into());
                }
            }
        }
        Ok(None)
    }

    async fn complete(&self, job_id: Uuid, result: &str) -> Result<bool, StoreError> {
        self.finish(job_id, JobStatus::Success, result).await
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<bool, StoreError> {
        self.finish(job_id, JobStatus::Failure, error).await
    }

    async fn get(&self, job_id: Uuid) -> Result<Job, StoreError> {
        queries::get_job(&self.db, job_id)
            .await?
            .ok_or(StoreError::NotFound(job_id))
    }

    async fn queue_depth(&self) -> Result<u64, StoreError> {
        Ok(self.queue.queue_depth().await?)
    }

    async fn count(&self, status: JobStatus) -> Result<u64, StoreError> {
        let count = queries::count_by_status(&self.db, status).await?;
        Ok(count.max(0) as u64)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.queue.health_check().await?;
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn close(&self) {
        self.db.close().await;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Job {0} not found")]
    NotFound(Uuid),

    #[error("Job {job_id} cannot move from {from} to {to}")]
    InvalidTransition {
        job_id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Broker error: {0}")]
    Queue(#[from] QueueError),

    #[error("Result backend error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Broker or backend trouble that may clear up on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Queue(_) | StoreError::Database(_))
    }
}
