//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::types::SeedMode;

/// Main configuration for the seeding worker
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Job manager queue settings
    pub queue: QueueConfig,

    /// Tile proxy and seeding tool settings
    pub mapproxy: MapproxyConfig,

    /// Job tracker settings
    pub job_tracker: JobTrackerConfig,

    /// Seeding behaviour and retry bounds
    pub seeding: SeedingConfig,

    /// Outbound HTTP settings
    pub http: HttpConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Job manager queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Job manager base URL
    pub job_manager_url: String,

    /// Heartbeat service base URL
    pub heartbeat_url: String,

    /// Interval between heartbeats for a running task
    pub heartbeat_interval_ms: u64,

    /// Sleep between polls when no task was handled
    pub dequeue_interval_ms: u64,

    /// Job type to dequeue from
    pub job_type: String,

    /// Task type to dequeue
    pub task_type: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            job_manager_url: "http://localhost:8081".to_string(),
            heartbeat_url: "http://localhost:8082".to_string(),
            heartbeat_interval_ms: 3000,
            dequeue_interval_ms: 1000,
            job_type: "TilesSeeding".to_string(),
            task_type: "TilesSeeding".to_string(),
        }
    }
}

impl QueueConfig {
    pub fn dequeue_interval(&self) -> Duration {
        Duration::from_millis(self.dequeue_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

/// Tile proxy and seeding tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapproxyConfig {
    /// Proxy API base URL serving `/config`
    pub api_url: String,

    /// Where the fetched proxy configuration snapshot is written
    pub config_path: PathBuf,

    /// Where the generated seed specification is written
    pub seed_spec_path: PathBuf,

    /// Where the coverage geometry is written
    pub coverage_path: PathBuf,

    /// Progress checkpoint path prefix, suffixed with `_seed` or `_clean`
    pub progress_file_prefix: String,

    /// Seeding tool binary
    pub seed_command: String,

    /// Worker count passed to the seeding tool
    pub seed_concurrency: u32,

    /// How long an interrupted seeding tool may take to stop its workers
    /// before it is killed
    pub interrupt_grace_secs: u64,
}

impl Default for MapproxyConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8083".to_string(),
            config_path: PathBuf::from("/mapproxy/mapproxy.yaml"),
            seed_spec_path: PathBuf::from("/mapproxy/seed.yaml"),
            coverage_path: PathBuf::from("/mapproxy/coverage.json"),
            progress_file_prefix: "/mapproxy/mapproxy_seed_progress".to_string(),
            seed_command: "mapproxy-seed".to_string(),
            seed_concurrency: 5,
            interrupt_grace_secs: 10,
        }
    }
}

impl MapproxyConfig {
    pub fn interrupt_grace(&self) -> Duration {
        Duration::from_secs(self.interrupt_grace_secs)
    }

    /// Progress checkpoint for one mode
    pub fn progress_file(&self, mode: SeedMode) -> PathBuf {
        PathBuf::from(format!("{}_{}", self.progress_file_prefix, mode))
    }
}

/// Job tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobTrackerConfig {
    /// Job tracker base URL
    pub url: String,
}

impl Default for JobTrackerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8090".to_string(),
        }
    }
}

/// Seeding behaviour configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedingConfig {
    /// Tasks with more queue attempts than this are rejected without running
    pub max_attempts: u32,

    /// Pause before executing a task so a proxy reload can settle
    pub graceful_reload_max_seconds: u64,

    /// Years added to `refreshBefore` before it is handed to the tool
    pub refresh_before_years_offset: u32,

    /// Invalid-bbox retries per sub-task
    pub invalid_bbox_retry_limit: u32,

    /// Buffer added per invalid-bbox retry, in meters
    pub invalid_bbox_buffer_meters: f64,

    /// Whether an unknown seed mode is rejected as retryable
    pub unsupported_mode_retryable: bool,
}

impl Default for SeedingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            graceful_reload_max_seconds: 0,
            refresh_before_years_offset: 1,
            invalid_bbox_retry_limit: 3,
            invalid_bbox_buffer_meters: 600.0,
            unsupported_mode_retryable: true,
        }
    }
}

impl SeedingConfig {
    pub fn graceful_reload_delay(&self) -> Duration {
        Duration::from_secs(self.graceful_reload_max_seconds)
    }
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Total attempts for a request that fails with a transport error or 5xx
    pub retry_attempts: u32,

    /// Delay before the first retry
    pub retry_delay_ms: u64,

    /// Double the delay after every retry
    pub exponential_backoff: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            retry_attempts: 5,
            retry_delay_ms: 500,
            exponential_backoff: true,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay before retry number `retry` (1-based)
    pub fn retry_delay(&self, retry: u32) -> Duration {
        let base = Duration::from_millis(self.retry_delay_ms);
        if self.exponential_backoff {
            base.saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
        } else {
            base
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Console filter when RUST_LOG is unset
    pub level: String,

    /// Directory for daily-rolling JSON logs
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_file_is_namespaced_by_mode() {
        let config = MapproxyConfig::default();
        assert_eq!(
            config.progress_file(SeedMode::Seed),
            PathBuf::from("/mapproxy/mapproxy_seed_progress_seed")
        );
        assert_eq!(
            config.progress_file(SeedMode::Clean),
            PathBuf::from("/mapproxy/mapproxy_seed_progress_clean")
        );
    }

    #[test]
    fn test_retry_delay_exponential() {
        let http = HttpConfig {
            retry_delay_ms: 100,
            ..Default::default()
        };
        assert_eq!(http.retry_delay(1), Duration::from_millis(100));
        assert_eq!(http.retry_delay(2), Duration::from_millis(200));
        assert_eq!(http.retry_delay(4), Duration::from_millis(800));
    }

    #[test]
    fn test_retry_delay_fixed() {
        let http = HttpConfig {
            retry_delay_ms: 100,
            exponential_backoff: false,
            ..Default::default()
        };
        assert_eq!(http.retry_delay(3), Duration::from_millis(100));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: WorkerConfig = serde_yaml::from_str("seeding:\n  max_attempts: 7\n").unwrap();
        assert_eq!(config.seeding.max_attempts, 7);
        assert_eq!(config.seeding.invalid_bbox_buffer_meters, 600.0);
        assert_eq!(config.mapproxy.seed_concurrency, 5);
    }
}
