use async_trait::async_trait;
use redis::AsyncCommands;
use uuid::Uuid;

const QUEUE_KEY: &str = "travel_agent:jobs";
const PROCESSING_KEY: &str = "travel_agent:processing";

/// Hands job ids to workers.
///
/// An id moves from the pending list to the processing list when it is
/// dequeued, and leaves the processing list on `complete` or `requeue`.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn enqueue(&self, job_id: Uuid) -> Result<(), QueueError>;

    async fn dequeue(&self) -> Result<Option<Uuid>, QueueError>;

    async fn complete(&self, job_id: Uuid) -> Result<(), QueueError>;

    /// Put a dequeued id back at the head of the pending list.
    async fn requeue(&self, job_id: Uuid) -> Result<(), QueueError>;

    async fn health_check(&self) -> Result<(), QueueError>;

    async fn queue_depth(&self) -> Result<u64, QueueError>;
}

/// Redis-backed broker list of pending job ids.
///
/// Only ids travel through Redis; the job record itself lives in the
/// result backend.
pub struct JobQueue {
    client: redis::Client,
    queue_key: String,
    processing_key: String,
}

impl JobQueue {
    pub fn new(redis_url: &str) -> Result<Self, QueueError> {
        Self::with_namespace(redis_url, QUEUE_KEY, PROCESSING_KEY)
    }

    /// Use custom list keys (integration tests isolate themselves this way).
    pub fn with_namespace(
        redis_url: &str,
        queue_key: &str,
        processing_key: &str,
    ) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            queue_key: queue_key.to_string(),
            processing_key: processing_key.to_string(),
        })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, QueueError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl Broker for JobQueue {
    /// Make a job id visible to workers.
    async fn enqueue(&self, job_id: Uuid) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        conn.lpush::<_, _, ()>(&self.queue_key, job_id.to_string())
            .await?;
        Ok(())
    }

    /// Pop the oldest pending id and move it onto the processing list.
    ///
    /// `RPOPLPUSH` is atomic, so concurrent callers never receive the same id.
    async fn dequeue(&self) -> Result<Option<Uuid>, QueueError> {
        let mut conn = self.connection().await?;
        let result: Option<String> = conn
            .rpoplpush(&self.queue_key, &self.processing_key)
            .await?;

        match result {
            Some(raw) => match Uuid::parse_str(&raw) {
                Ok(id) => Ok(Some(id)),
                Err(_) => {
                    // Not ours; drop it so it cannot wedge the list.
                    conn.lrem::<_, _, ()>(&self.processing_key, 1, &raw).await?;
                    Err(QueueError::MalformedEntry(raw))
                }
            },
            None => Ok(None),
        }
    }

    /// Remove a finished job id from the processing list.
    async fn complete(&self, job_id: Uuid) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        conn.lrem::<_, _, ()>(&self.processing_key, 1, job_id.to_string())
            .await?;
        Ok(())
    }

    async fn requeue(&self, job_id: Uuid) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        let id = job_id.to_string();
        // RPOPLPUSH pops from the right, so RPUSH makes this id the next one out.
        redis::pipe()
            .atomic()
            .lrem(&self.processing_key, 1, &id)
            .ignore()
            .rpush(&self.queue_key, &id)
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    /// Check Redis connectivity (for health checks).
    async fn health_check(&self) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    /// Get the current queue depth (pending jobs).
    async fn queue_depth(&self) -> Result<u64, QueueError> {
        let mut conn = self.connection().await?;
        let depth: u64 = conn.llen(&self.queue_key).await?;
        Ok(depth)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Malformed job id on broker list: {0}")]
    MalformedEntry(String),
}
