//! Collaborator traits consumed by the engine

use tileseed_core::{JobMetadata, QueueTask};

use crate::error::Result;
use crate::heartbeat::HeartbeatHandle;

/// The job queue tasks are pulled from and resolved against.
///
/// Attempt counting belongs to the queue: a retryable reject increments it,
/// the engine only reads it.
#[async_trait::async_trait]
pub trait TaskQueue: Send + Sync {
    /// Take the next pending task of the given type, `None` when idle
    async fn dequeue(&self, job_type: &str, task_type: &str) -> Result<Option<QueueTask>>;

    /// Mark a task completed
    async fn ack(&self, job_id: &str, task_id: &str) -> Result<()>;

    /// Mark a task failed, optionally letting the queue hand it out again
    async fn reject(
        &self,
        job_id: &str,
        task_id: &str,
        should_retry: bool,
        reason: Option<&str>,
    ) -> Result<()>;

    /// Fetch the parent job of a task
    async fn get_job(&self, job_id: &str) -> Result<JobMetadata>;
}

/// Receives a notification whenever a task reaches a final state
#[async_trait::async_trait]
pub trait JobTracker: Send + Sync {
    async fn notify(&self, task_id: &str) -> Result<()>;
}

/// Source of the tile proxy's live configuration
#[async_trait::async_trait]
pub trait ProxyConfigSource: Send + Sync {
    /// Fetch the current configuration as raw YAML text
    async fn get_config(&self) -> Result<String>;
}

/// Keeps a dequeued task marked as alive while it runs
pub trait Heartbeat: Send + Sync {
    /// Start sending heartbeats for `task_id` until the handle is stopped
    fn start(&self, task_id: &str) -> HeartbeatHandle;
}
