use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::sleep;
use uuid::Uuid;

use crate::models::job::Job;
use crate::services::job_store::{JobStore, StoreError};
use crate::services::orchestrator::Orchestrator;

/// Tries per terminal write before the answer is given up.
pub const TERMINAL_WRITE_ATTEMPTS: u32 = 3;

/// Claims jobs one at a time and runs the orchestration routine on them.
pub struct Worker {
    name: String,
    store: Arc<dyn JobStore>,
    orchestrator: Arc<dyn Orchestrator>,
    idle_interval: Duration,
}

impl Worker {
    pub fn new(
        name: impl Into<String>,
        store: Arc<dyn JobStore>,
        orchestrator: Arc<dyn Orchestrator>,
        idle_interval: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            store,
            orchestrator,
            idle_interval,
        }
    }

    /// Run claim loops until `shutdown` flips to `true`.
    ///
    /// Shutdown is only observed between jobs; a claimed job always runs to
    /// completion.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(worker = %self.name, "Worker ready, starting job processing loop");

        while !*shutdown.borrow() {
            let wait = match self.run_once().await {
                Ok(true) => {
                    tracing::debug!(worker = %self.name, "Job processed, checking for next job");
                    continue;
                }
                Ok(false) => {
                    tracing::trace!(worker = %self.name, "No jobs available, sleeping");
                    self.idle_interval
                }
                Err(e) => {
                    tracing::error!(worker = %self.name, error = %e, "Job store error, will retry");
                    self.idle_interval
                }
            };

            tokio::select! {
                _ = sleep(wait) => {}
                changed = shutdown.changed() => {
                    // Sender dropped; treat as shutdown.
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!(worker = %self.name, "Worker stopped");
    }

    /// Process the next job from the store.
    /// Returns Ok(true) if a job was processed, Ok(false) if no job available.
    pub async fn run_once(&self) -> Result<bool, StoreError> {
        let job = match self.store.claim_next().await? {
            Some(job) => job,
            None => return Ok(false),
        };

        tracing::info!(worker = %self.name, job_id = %job.id, "Processing travel query");
        let start = Instant::now();

        let outcome = self.execute(&job).await;
        metrics::histogram!("travel_job_processing_seconds").record(start.elapsed().as_secs_f64());

        self.record(job.id, &outcome).await?;

        match outcome {
            Ok(_) => {
                metrics::counter!("travel_jobs_completed_total").increment(1);
                tracing::info!(
                    worker = %self.name,
                    job_id = %job.id,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Job completed successfully"
                );
            }
            Err(error) => {
                metrics::counter!("travel_jobs_failed_total").increment(1);
                tracing::warn!(
                    worker = %self.name,
                    job_id = %job.id,
                    error = %error,
                    "Job failed"
                );
            }
        }

        Ok(true)
    }

    /// Write the terminal status, retrying transient store errors after the
    /// idle interval.
    async fn record(&self, job_id: Uuid, outcome: &Result<String, String>) -> Result<bool, StoreError> {
        let mut attempt = 1;
        loop {
            let written = match outcome {
                Ok(answer) => self.store.complete(job_id, answer).await,
                Err(error) => self.store.fail(job_id, error).await,
            };

            match written {
                Err(e) if e.is_transient() && attempt < TERMINAL_WRITE_ATTEMPTS => {
                    tracing::warn!(
                        worker = %self.name,
                        job_id = %job_id,
                        attempt,
                        error = %e,
                        "Terminal write failed, retrying"
                    );
                    sleep(self.idle_interval).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Run the orchestration routine on its own task so that a panic is
    /// reported as a failure instead of tearing down the worker loop.
    async fn execute(&self, job: &Job) -> Result<String, String> {
        let orchestrator = Arc::clone(&self.orchestrator);
        let payload = job.payload.clone();

        let handle = tokio::spawn(async move { orchestrator.run(&payload).await });

        match handle.await {
            Ok(Ok(answer)) => Ok(answer),
            Ok(Err(e)) => Err(e.to_string()),
            Err(join_error) if join_error.is_panic() => {
                let panic = join_error.into_panic();
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(format!("orchestration task panicked: {}", detail))
            }
            Err(join_error) => Err(format!("orchestration task aborted: {}", join_error)),
        }
    }
}

/// Spawn `count` worker loops sharing one store and orchestrator.
pub fn spawn_workers(
    count: usize,
    prefix: &str,
    store: Arc<dyn JobStore>,
    orchestrator: Arc<dyn Orchestrator>,
    idle_interval: Duration,
    shutdown: watch::Receiver<bool>,
) -> Vec<tokio::task::JoinHandle<()>> {
    (0..count)
        .map(|i| {
            let worker = Worker::new(
                format!("{}-{}", prefix, i),
                Arc::clone(&store),
                Arc::clone(&orchestrator),
                idle_interval,
            );
            let shutdown = shutdown.clone();
            tokio::spawn(async move { worker.run(shutdown).await })
        })
        .collect()
}
