//! Task dispatch
//!
//! A dispatch cycle takes one task off the queue, checks its preconditions,
//! runs its sub-tasks in order and resolves it against the queue. The
//! job tracker is notified after every resolution.

use std::fmt;
use std::sync::Arc;

use tileseed_clients::{Heartbeat, JobTracker, TaskQueue};
use tileseed_core::config::{QueueConfig, SeedingConfig};
use tileseed_core::validation::validate_cache_type;
use tileseed_core::{QueueTask, TaskParameters, WorkerConfig};
use tracing::{field, info, info_span, warn, Instrument, Span};

use crate::error::{DispatchError, Disposition, SeedError};
use crate::executor::SeedOperationExecutor;

/// How a dispatch cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No task was pending
    Idle,
    /// All sub-tasks succeeded and the task was acknowledged
    Completed,
    /// The task was rejected and may be handed out again
    RetryableFailed { reason: String },
    /// The task was rejected for good
    TerminalFailed { reason: Option<String> },
}

impl DispatchOutcome {
    /// Whether a task was dequeued
    pub fn handled(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Completed => f.write_str("completed"),
            Self::RetryableFailed { .. } => f.write_str("failed (retryable)"),
            Self::TerminalFailed { .. } => f.write_str("failed (terminal)"),
        }
    }
}

/// Pulls tasks off the queue and drives them to a final state
pub struct TaskDispatcher {
    queue: Arc<dyn TaskQueue>,
    tracker: Arc<dyn JobTracker>,
    heartbeat: Arc<dyn Heartbeat>,
    executor: SeedOperationExecutor,
    queue_config: QueueConfig,
    seeding: SeedingConfig,
}

impl TaskDispatcher {
    pub fn new(
        config: &WorkerConfig,
        queue: Arc<dyn TaskQueue>,
        tracker: Arc<dyn JobTracker>,
        heartbeat: Arc<dyn Heartbeat>,
        executor: SeedOperationExecutor,
    ) -> Self {
        Self {
            queue,
            tracker,
            heartbeat,
            executor,
            queue_config: config.queue.clone(),
            seeding: config.seeding.clone(),
        }
    }

    /// Run one dispatch cycle. Returns `false` when no task was pending.
    pub async fn process_next_task(&self) -> Result<bool, DispatchError> {
        Ok(self.dispatch().await?.handled())
    }

    /// Run one dispatch cycle and report how it ended
    pub async fn dispatch(&self) -> Result<DispatchOutcome, DispatchError> {
        let task = self
            .queue
            .dequeue(&self.queue_config.job_type, &self.queue_config.task_type)
            .await
            .map_err(DispatchError::Dequeue)?;

        let Some(task) = task else {
            return Ok(DispatchOutcome::Idle);
        };

        let span = info_span!(
            "task",
            job_id = %task.job_id,
            task_id = %task.id,
            attempts = task.attempts,
            traceparent = field::Empty
        );
        let outcome = self.handle(&task).instrument(span.clone()).await?;
        span.in_scope(|| info!(outcome = %outcome, "task resolved"));
        Ok(outcome)
    }

    async fn handle(&self, task: &QueueTask) -> Result<DispatchOutcome, DispatchError> {
        let params = match task.decode_parameters() {
            Ok(params) => params,
            Err(e) => {
                warn!(error = %e, "rejecting task with undecodable parameters");
                return self.terminal(task, Some(e.to_string())).await;
            }
        };
        if let Some(traceparent) = params.traceparent() {
            Span::current().record("traceparent", traceparent);
        }

        if let Err(e) = validate_cache_type(&params.cache_type) {
            warn!(cache_type = %params.cache_type, "rejecting task with unsupported cache type");
            return self.terminal(task, Some(e.to_string())).await;
        }

        let job = self
            .queue
            .get_job(&task.job_id)
            .await
            .map_err(|source| DispatchError::GetJob {
                job_id: task.job_id.clone(),
                source,
            })?;
        info!(
            resource_id = ?job.resource_id,
            version = ?job.version,
            product_type = ?job.product_type,
            sub_tasks = params.seed_tasks.len(),
            "processing task"
        );

        if task.attempts > self.seeding.max_attempts {
            warn!(
                max_attempts = self.seeding.max_attempts,
                "task exceeded its attempts, rejecting without running"
            );
            return self.terminal(task, None).await;
        }

        let heartbeat = self.heartbeat.start(&task.id);
        let delay = self.seeding.graceful_reload_delay();
        if !delay.is_zero() {
            info!(delay_secs = delay.as_secs(), "waiting for proxy reload");
            tokio::time::sleep(delay).await;
        }
        let result = self.run_sub_tasks(task, &params).await;
        heartbeat.stop().await;

        let outcome = match result {
            Ok(()) => DispatchOutcome::Completed,
            Err(e) => match e.disposition(self.seeding.unsupported_mode_retryable) {
                Disposition::Retryable => DispatchOutcome::RetryableFailed {
                    reason: e.to_string(),
                },
                Disposition::Terminal => DispatchOutcome::TerminalFailed {
                    reason: Some(e.to_string()),
                },
            },
        };
        self.resolve(task, outcome).await
    }

    async fn run_sub_tasks(&self, task: &QueueTask, params: &TaskParameters) -> Result<(), SeedError> {
        for (index, seed_task) in params.seed_tasks.iter().enumerate() {
            info!(index, layer_id = %seed_task.layer_id, mode = %seed_task.mode, "running sub-task");
            self.executor
                .run_sub_task(seed_task, &task.job_id, &task.id)
                .await?;
        }
        Ok(())
    }

    async fn terminal(&self, task: &QueueTask, reason: Option<String>) -> Result<DispatchOutcome, DispatchError> {
        self.resolve(task, DispatchOutcome::TerminalFailed { reason }).await
    }

    async fn resolve(&self, task: &QueueTask, outcome: DispatchOutcome) -> Result<DispatchOutcome, DispatchError> {
        let resolved = match &outcome {
            DispatchOutcome::Idle => return Ok(outcome),
            DispatchOutcome::Completed => self.queue.ack(&task.job_id, &task.id).await,
            DispatchOutcome::RetryableFailed { reason } => {
                self.queue
                    .reject(&task.job_id, &task.id, true, Some(reason))
                    .await
            }
            DispatchOutcome::TerminalFailed { reason } => {
                self.queue
                    .reject(&task.job_id, &task.id, false, reason.as_deref())
                    .await
            }
        };
        resolved.map_err(|source| DispatchError::Resolve {
            task_id: task.id.clone(),
            source,
        })?;

        self.tracker
            .notify(&task.id)
            .await
            .map_err(|source| DispatchError::Notify {
                task_id: task.id.clone(),
                source,
            })?;

        Ok(outcome)
    }
}
