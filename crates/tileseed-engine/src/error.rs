//! Engine error types

use thiserror::Error;
use tileseed_clients::ClientError;
use tileseed_core::ValidationError;

/// How a seeding process invocation failed
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The binary could not be started
    #[error("Shell error: {0}")]
    Spawn(#[source] std::io::Error),

    /// The process ended unsuccessfully. `code` is `None` when it was
    /// terminated by a signal.
    #[error(
        "Command failed with error [{}], status code: {}",
        .last_stderr,
        .code.map_or_else(|| "none".to_string(), |c| c.to_string())
    )]
    Exited {
        code: Option<i32>,
        last_stderr: String,
    },

    /// A fatal output line cancelled the run
    #[error("Interrupted because shell abort: {0}")]
    Aborted(String),

    /// Reading the output failed while the process itself succeeded
    #[error("Interrupted because process error: {0}")]
    Stream(#[source] std::io::Error),
}

/// Whether the queue should hand a failed task out again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Retryable,
    Terminal,
}

impl Disposition {
    pub fn should_retry(&self) -> bool {
        matches!(self, Self::Retryable)
    }
}

/// A sub-task failed
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Unsupported seeding mode: {0}, should be one of: 'seed' or 'clean'")]
    UnsupportedMode(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to fetch mapproxy config: {0}")]
    ConfigFetch(#[source] ClientError),

    #[error("failed to parse mapproxy config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Writing one of the working files failed
    #[error("{context}: {message}")]
    FileWrite { context: String, message: String },

    /// The seeding process failed with something other than an invalid bbox
    #[error("failed {mode} for job of {layer_id} with reason: {source}")]
    Process {
        mode: String,
        layer_id: String,
        #[source]
        source: ProcessError,
    },

    /// The invalid-bbox retries ran out
    #[error("Reject task and mark nonresettable: exceeded {max_retries} invalid bbox retries for layer {layer_id}")]
    ExceededMaxRetries { layer_id: String, max_retries: u32 },
}

impl SeedError {
    pub(crate) fn file_write(context: impl Into<String>, message: impl ToString) -> Self {
        Self::FileWrite {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Retry decision for this failure.
    ///
    /// An unknown seed mode is retryable unless `unsupported_mode_retryable`
    /// is turned off.
    pub fn disposition(&self, unsupported_mode_retryable: bool) -> Disposition {
        match self {
            Self::Validation(_) | Self::ExceededMaxRetries { .. } => Disposition::Terminal,
            Self::UnsupportedMode(_) if !unsupported_mode_retryable => Disposition::Terminal,
            _ => Disposition::Retryable,
        }
    }
}

/// A dispatch cycle could not talk to one of its collaborators.
///
/// Failures of the seed itself never show up here; they are resolved
/// against the queue and reported through [`crate::DispatchOutcome`].
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to dequeue task: {0}")]
    Dequeue(#[source] ClientError),

    #[error("failed to fetch job {job_id}: {source}")]
    GetJob {
        job_id: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to resolve task {task_id}: {source}")]
    Resolve {
        task_id: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to notify job tracker for task {task_id}: {source}")]
    Notify {
        task_id: String,
        #[source]
        source: ClientError,
    },
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, SeedError>;
