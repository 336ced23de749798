//! Polling loop

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::dispatcher::TaskDispatcher;

/// Polls the dispatcher until shut down.
///
/// A running task is always finished before shutdown is honoured.
pub struct Worker {
    dispatcher: Arc<TaskDispatcher>,
    idle_interval: Duration,
}

impl Worker {
    pub fn new(dispatcher: Arc<TaskDispatcher>, idle_interval: Duration) -> Self {
        Self {
            dispatcher,
            idle_interval,
        }
    }

    /// Run until `shutdown` is cancelled. Returns the number of tasks handled.
    pub async fn run(&self, shutdown: CancellationToken) -> usize {
        info!(idle_interval_ms = self.idle_interval.as_millis() as u64, "worker started");
        let mut handled = 0;

        while !shutdown.is_cancelled() {
            let idle = match self.dispatcher.process_next_task().await {
                Ok(true) => {
                    handled += 1;
                    false
                }
                Ok(false) => true,
                Err(e) => {
                    error!(error = %e, "dispatch cycle failed");
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.idle_interval) => {}
                }
            }
        }

        info!(handled, "worker stopped");
        handled
    }
}
