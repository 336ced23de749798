//! Seed execution reporting

use std::path::PathBuf;
use std::time::Duration;

/// What a working file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkingFile {
    /// Snapshot of the proxy configuration
    ProxyConfig,
    /// Coverage geometry
    Coverage,
    /// Generated seed specification
    SeedSpec,
}

/// Events emitted while a sub-task runs
#[derive(Debug, Clone, PartialEq)]
pub enum SeedEvent {
    /// A sub-task passed its mode check and is starting
    Started { layer_id: String, mode: String },
    /// A working file was written. `buffer_meters` is set for buffered
    /// coverage written by a bbox retry.
    FileWritten {
        kind: WorkingFile,
        path: PathBuf,
        buffer_meters: Option<f64>,
    },
    /// The seeding tool is being started
    ProcessStarted { command: String, attempt: u32 },
    /// The tool reported progress
    Progress { line: String },
    /// A fatal output line cancelled the run
    Aborted { reason: String },
    /// The tool rejected the bbox and the run is repeated with a buffer
    BboxRetry { attempt: u32, buffer_meters: f64 },
    /// A sub-task finished successfully
    Completed { layer_id: String, duration: Duration },
    /// A sub-task failed
    Failed {
        layer_id: String,
        duration: Duration,
        error: String,
    },
}

/// Trait for reporting seed execution progress
pub trait SeedReporter: Send + Sync {
    /// Handle a seed event
    fn report(&self, event: &SeedEvent);
}

/// Reporter that logs to tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl SeedReporter for TracingReporter {
    fn report(&self, event: &SeedEvent) {
        match event {
            SeedEvent::Started { layer_id, mode } => {
                tracing::info!(layer_id = %layer_id, mode = %mode, "starting {} for {}", mode, layer_id);
            }
            SeedEvent::FileWritten {
                kind,
                path,
                buffer_meters,
            } => {
                tracing::debug!(?kind, path = %path.display(), ?buffer_meters, "working file written");
            }
            SeedEvent::ProcessStarted { command, attempt } => {
                tracing::info!(attempt, "running: {}", command);
            }
            SeedEvent::Progress { line } => {
                tracing::debug!("{}", line);
            }
            SeedEvent::Aborted { reason } => {
                tracing::error!(reason = %reason, "seeding tool reported a fatal error, aborting");
            }
            SeedEvent::BboxRetry {
                attempt,
                buffer_meters,
            } => {
                tracing::warn!(attempt, buffer_meters, "invalid bbox, retrying with buffered coverage");
            }
            SeedEvent::Completed { layer_id, duration } => {
                tracing::info!(layer_id = %layer_id, "completed in {:.1}s", duration.as_secs_f64());
            }
            SeedEvent::Failed {
                layer_id,
                duration,
                error,
            } => {
                tracing::error!(
                    layer_id = %layer_id,
                    "failed after {:.1}s: {}",
                    duration.as_secs_f64(),
                    error
                );
            }
        }
    }
}

/// Reporter that collects events for later inspection
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: std::sync::Mutex<Vec<SeedEvent>>,
}

impl CollectingReporter {
    /// Get all collected events
    pub fn events(&self) -> Vec<SeedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of process invocations seen
    pub fn process_runs(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SeedEvent::ProcessStarted { .. }))
            .count()
    }

    /// Number of working files of `kind` written
    pub fn writes_of(&self, kind: WorkingFile) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SeedEvent::FileWritten { kind: k, .. } if *k == kind))
            .count()
    }

    /// Number of working files written, of any kind
    pub fn total_writes(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SeedEvent::FileWritten { .. }))
            .count()
    }
}

impl SeedReporter for CollectingReporter {
    fn report(&self, event: &SeedEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
