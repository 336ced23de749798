//! In-memory collaborators for engine tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tileseed_clients::{
    ClientError, Heartbeat, HeartbeatHandle, JobTracker, ProxyConfigSource, TaskQueue,
};
use tileseed_core::{Geometry, JobMetadata, Position, QueueTask, SeedTask};

use crate::error::ProcessError;
use crate::process::{Cancellation, CommandRunner, SeedCommand};

pub const BBOX_FAILURE: &str = "mapproxy.grid.GridError: Invalid BBOX";

pub fn proxy_config_yaml(backend: &str) -> String {
    format!(
        r#"
services:
  demo:
layers:
  - name: test
    sources: [test]
caches:
  test:
    grids: [wgs84]
    format: image/png
    cache:
      type: {}
      host: redis
      port: 6379
grids:
  wgs84:
    srs: EPSG:4326
"#,
        backend
    )
}

pub fn polygon_seed_task() -> SeedTask {
    SeedTask {
        mode: "seed".to_string(),
        grid: "wgs84".to_string(),
        from_zoom_level: 0,
        to_zoom_level: 21,
        geometry: Geometry::Polygon {
            coordinates: vec![vec![
                Position::new(34.8, 31.2),
                Position::new(35.1, 31.2),
                Position::new(35.1, 31.5),
                Position::new(34.8, 31.5),
                Position::new(34.8, 31.2),
            ]],
        },
        skip_uncached: false,
        layer_id: "test".to_string(),
        refresh_before: "2025-01-16T16:14:22".to_string(),
    }
}

pub struct FakeProxy {
    yaml: Option<String>,
}

impl FakeProxy {
    pub fn new(yaml: &str) -> Self {
        Self {
            yaml: Some(yaml.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { yaml: None }
    }
}

#[async_trait]
impl ProxyConfigSource for FakeProxy {
    async fn get_config(&self) -> tileseed_clients::Result<String> {
        self.yaml
            .clone()
            .ok_or_else(|| ClientError::Other("connection refused".to_string()))
    }
}

/// Runner replaying scripted outcomes. `Err(text)` becomes a non-zero
/// exit whose last stderr line is `text`.
pub struct ScriptedRunner {
    script: Mutex<VecDeque<Result<(), String>>>,
    fallback: Result<(), String>,
    output: Vec<String>,
    commands: Mutex<Vec<SeedCommand>>,
}

impl ScriptedRunner {
    fn new(script: Vec<Result<(), String>>, fallback: Result<(), String>, output: Vec<String>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            output,
            commands: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(Vec::new(), Ok(()), Vec::new())
    }

    pub fn always_failing(stderr: &str) -> Self {
        Self::new(Vec::new(), Err(stderr.to_string()), Vec::new())
    }

    pub fn failing_then_succeeding(stderr: &str, failures: usize) -> Self {
        Self::new(vec![Err(stderr.to_string()); failures], Ok(()), Vec::new())
    }

    pub fn sequence(script: Vec<Result<(), String>>) -> Self {
        Self::new(script, Ok(()), Vec::new())
    }

    pub fn with_output(lines: Vec<String>) -> Self {
        Self::new(Vec::new(), Ok(()), lines)
    }

    pub fn calls(&self) -> usize {
        self.commands.lock().unwrap().len()
    }

    pub fn commands(&self) -> Vec<SeedCommand> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        command: &SeedCommand,
        on_line: &mut (dyn for<'l> FnMut(&'l str) + Send),
        cancellation: &Cancellation,
    ) -> Result<(), ProcessError> {
        self.commands.lock().unwrap().push(command.clone());

        for line in &self.output {
            on_line(line);
            if cancellation.is_cancelled() {
                return Err(ProcessError::Aborted(
                    cancellation.reason().unwrap_or_default().to_string(),
                ));
            }
        }

        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        outcome.map_err(|last_stderr| ProcessError::Exited {
            code: Some(1),
            last_stderr,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueCall {
    Dequeue,
    GetJob(String),
    Ack(String),
    Reject {
        task_id: String,
        should_retry: bool,
        reason: Option<String>,
    },
}

/// Queue holding at most one pending task
#[derive(Default)]
pub struct FakeQueue {
    pending: Mutex<Option<QueueTask>>,
    fail_get_job: bool,
    calls: Mutex<Vec<QueueCall>>,
}

impl FakeQueue {
    pub fn with_task(task: QueueTask) -> Self {
        Self {
            pending: Mutex::new(Some(task)),
            ..Default::default()
        }
    }

    pub fn failing_get_job(task: QueueTask) -> Self {
        Self {
            pending: Mutex::new(Some(task)),
            fail_get_job: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<QueueCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn acks(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, QueueCall::Ack(_)))
            .count()
    }

    pub fn rejects(&self) -> Vec<(bool, Option<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                QueueCall::Reject {
                    should_retry,
                    reason,
                    ..
                } => Some((should_retry, reason)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl TaskQueue for FakeQueue {
    async fn dequeue(&self, _job_type: &str, _task_type: &str) -> tileseed_clients::Result<Option<QueueTask>> {
        self.calls.lock().unwrap().push(QueueCall::Dequeue);
        Ok(self.pending.lock().unwrap().take())
    }

    async fn ack(&self, _job_id: &str, task_id: &str) -> tileseed_clients::Result<()> {
        self.calls.lock().unwrap().push(QueueCall::Ack(task_id.to_string()));
        Ok(())
    }

    async fn reject(
        &self,
        _job_id: &str,
        task_id: &str,
        should_retry: bool,
        reason: Option<&str>,
    ) -> tileseed_clients::Result<()> {
        self.calls.lock().unwrap().push(QueueCall::Reject {
            task_id: task_id.to_string(),
            should_retry,
            reason: reason.map(str::to_string),
        });
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> tileseed_clients::Result<JobMetadata> {
        self.calls.lock().unwrap().push(QueueCall::GetJob(job_id.to_string()));
        if self.fail_get_job {
            return Err(ClientError::ApiError {
                service: "JobManager",
                status: 500,
                message: "unavailable".to_string(),
            });
        }
        Ok(JobMetadata {
            id: job_id.to_string(),
            resource_id: Some("someTestSeed".to_string()),
            ..Default::default()
        })
    }
}

#[derive(Default)]
pub struct FakeTracker {
    notified: Mutex<Vec<String>>,
}

impl FakeTracker {
    pub fn notified(&self) -> Vec<String> {
        self.notified.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobTracker for FakeTracker {
    async fn notify(&self, task_id: &str) -> tileseed_clients::Result<()> {
        self.notified.lock().unwrap().push(task_id.to_string());
        Ok(())
    }
}

/// Heartbeat counting how often it was started
#[derive(Default)]
pub struct CountingHeartbeat {
    started: Mutex<Vec<String>>,
}

impl CountingHeartbeat {
    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

impl Heartbeat for CountingHeartbeat {
    fn start(&self, task_id: &str) -> HeartbeatHandle {
        self.started.lock().unwrap().push(task_id.to_string());
        HeartbeatHandle::noop()
    }
}
