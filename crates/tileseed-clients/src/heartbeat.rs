//! Task heartbeat
//!
//! While a task runs, a background task posts a heartbeat for it at a fixed
//! interval so the queue does not reclaim it as abandoned.

use std::time::Duration;

use tileseed_core::config::{HttpConfig, QueueConfig};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::Result;
use crate::http::HttpClient;
use crate::traits::Heartbeat;

/// Posts `/heartbeat/{taskId}` to the heartbeat service
#[derive(Debug, Clone)]
pub struct HeartbeatClient {
    http: HttpClient,
    interval: Duration,
}

impl HeartbeatClient {
    pub fn new(queue: &QueueConfig, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new("Heartbeat", &queue.heartbeat_url, http)?,
            interval: queue.heartbeat_interval(),
        })
    }

    /// Send a single heartbeat
    pub async fn pulse(&self, task_id: &str) -> Result<()> {
        let request = self.http.post(&format!("/heartbeat/{}", task_id));
        self.http.check(self.http.send(request).await?).await?;
        Ok(())
    }
}

impl Heartbeat for HeartbeatClient {
    fn start(&self, task_id: &str) -> HeartbeatHandle {
        let token = CancellationToken::new();
        let client = self.clone();
        let task_id = task_id.to_string();
        let stopped = token.clone();

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(client.interval);
            loop {
                tokio::select! {
                    _ = stopped.cancelled() => break,
                    _ = ticker.tick() => {
                        tokio::select! {
                            _ = stopped.cancelled() => break,
                            result = client.pulse(&task_id) => {
                                if let Err(e) = result {
                                    warn!(service = client.http.service(), task_id = %task_id, error = %e, "heartbeat failed");
                                }
                            }
                        }
                    }
                }
            }
            debug!(task_id = %task_id, "heartbeat stopped");
        });

        HeartbeatHandle {
            token,
            join: Some(join),
        }
    }
}

/// Handle to a running heartbeat. Dropping it also stops the heartbeat.
#[derive(Debug)]
pub struct HeartbeatHandle {
    token: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl HeartbeatHandle {
    /// A handle with nothing behind it
    pub fn noop() -> Self {
        Self {
            token: CancellationToken::new(),
            join: None,
        }
    }

    /// Stop the heartbeat and wait for the loop to exit
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
