//! Job manager queue client
//!
//! Tasks are pulled with `startPending`, which atomically moves the oldest
//! pending task of a type to in-progress. Resolving a task is a plain task
//! update carrying the final status.

use async_trait::async_trait;
use serde_json::json;
use tileseed_core::config::{HttpConfig, QueueConfig};
use tileseed_core::{JobMetadata, QueueTask};
use tracing::{debug, info, instrument};

use crate::error::{ClientError, Result};
use crate::http::HttpClient;
use crate::traits::TaskQueue;

const STATUS_COMPLETED: &str = "Completed";
const STATUS_FAILED: &str = "Failed";

/// Job manager REST client
#[derive(Debug, Clone)]
pub struct JobManagerClient {
    http: HttpClient,
}

impl JobManagerClient {
    /// Create a client for the configured job manager
    pub fn new(queue: &QueueConfig, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new("JobManager", &queue.job_manager_url, http)?,
        })
    }

    /// Fetch a single task
    pub async fn get_task(&self, job_id: &str, task_id: &str) -> Result<QueueTask> {
        let request = self.http.get(&format!("/jobs/{}/tasks/{}", job_id, task_id));
        let response = self.http.check(self.http.send(request).await?).await?;
        Ok(response.json().await?)
    }

    async fn update_task(&self, job_id: &str, task_id: &str, body: serde_json::Value) -> Result<()> {
        debug!(job_id, task_id, body = %body, "updating task");
        let request = self
            .http
            .put(&format!("/jobs/{}/tasks/{}", job_id, task_id))
            .json(&body);
        self.http.check(self.http.send(request).await?).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskQueue for JobManagerClient {
    #[instrument(skip(self))]
    async fn dequeue(&self, job_type: &str, task_type: &str) -> Result<Option<QueueTask>> {
        let request = self
            .http
            .post(&format!("/tasks/{}/{}/startPending", job_type, task_type));

        match self.http.check(self.http.send(request).await?).await {
            Ok(response) => {
                let task: QueueTask = response.json().await?;
                info!(job_id = %task.job_id, task_id = %task.id, attempts = task.attempts, "dequeued task");
                Ok(Some(task))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    async fn ack(&self, job_id: &str, task_id: &str) -> Result<()> {
        self.update_task(
            job_id,
            task_id,
            json!({ "status": STATUS_COMPLETED, "percentage": 100 }),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn reject(
        &self,
        job_id: &str,
        task_id: &str,
        should_retry: bool,
        reason: Option<&str>,
    ) -> Result<()> {
        let mut body = json!({ "status": STATUS_FAILED });
        if let Some(reason) = reason {
            body["reason"] = json!(reason);
        }

        if should_retry {
            let task = self.get_task(job_id, task_id).await?;
            body["attempts"] = json!(task.attempts + 1);
        } else {
            body["resettable"] = json!(false);
        }

        self.update_task(job_id, task_id, body).await
    }

    #[instrument(skip(self))]
    async fn get_job(&self, job_id: &str) -> Result<JobMetadata> {
        let request = self
            .http
            .get(&format!("/jobs/{}", job_id))
            .query(&[("shouldReturnTasks", "false")]);
        let response = self.http.check(self.http.send(request).await?).await?;
        response.json().await.map_err(ClientError::from)
    }
}
