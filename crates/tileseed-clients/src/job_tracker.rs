//! Job tracker notifications

use async_trait::async_trait;
use tileseed_core::config::{HttpConfig, JobTrackerConfig};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::http::HttpClient;
use crate::traits::JobTracker;

/// Tells the job tracker a task reached a final state
#[derive(Debug, Clone)]
pub struct JobTrackerClient {
    http: HttpClient,
}

impl JobTrackerClient {
    pub fn new(tracker: &JobTrackerConfig, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new("JobTracker", &tracker.url, http)?,
        })
    }
}

#[async_trait]
impl JobTracker for JobTrackerClient {
    #[instrument(skip(self))]
    async fn notify(&self, task_id: &str) -> Result<()> {
        let request = self.http.post(&format!("/tasks/{}/notify", task_id));
        self.http.check(self.http.send(request).await?).await?;
        debug!(task_id, "job tracker notified");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::test_server::serve;

    fn client(url: &str) -> JobTrackerClient {
        let tracker = JobTrackerConfig {
            url: url.to_string(),
        };
        let http = HttpConfig {
            retry_attempts: 1,
            ..Default::default()
        };
        JobTrackerClient::new(&tracker, &http).unwrap()
    }

    #[tokio::test]
    async fn test_notify_posts_task() {
        let (url, requests) = serve(vec![(200, String::new())]).await;
        client(&url).notify("task-3").await.unwrap();

        let recorded = requests.lock().unwrap();
        assert_eq!(recorded[0].method, "POST");
        assert_eq!(recorded[0].path, "/tasks/task-3/notify");
    }

    #[tokio::test]
    async fn test_notify_surfaces_failure() {
        let (url, _) = serve(vec![(500, "down".to_string())]).await;
        let err = client(&url).notify("task-3").await.unwrap_err();
        assert!(matches!(err, ClientError::ApiError { status: 500, .. }));
    }
}
