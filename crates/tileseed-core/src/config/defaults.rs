//! Default configuration values

use super::types::WorkerConfig;

/// Config file names searched for, in priority order
pub const CONFIG_FILE_NAMES: &[&str] = &[
    "tileseed.yaml",
    "tileseed.toml",
    ".tileseed.yaml",
    ".tileseed.toml",
];

/// Default configuration template
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# tileseed worker configuration
#
# Service URLs, seed concurrency and max attempts can also be set with
# TILESEED_JOB_MANAGER_URL, TILESEED_HEARTBEAT_URL, TILESEED_JOB_TRACKER_URL,
# TILESEED_MAPPROXY_API_URL, TILESEED_SEED_CONCURRENCY and TILESEED_MAX_ATTEMPTS.

queue:
  job_manager_url: http://localhost:8081
  heartbeat_url: http://localhost:8082
  heartbeat_interval_ms: 3000
  dequeue_interval_ms: 1000
  job_type: TilesSeeding
  task_type: TilesSeeding

mapproxy:
  api_url: http://localhost:8083
  config_path: /mapproxy/mapproxy.yaml
  seed_spec_path: /mapproxy/seed.yaml
  coverage_path: /mapproxy/coverage.json
  progress_file_prefix: /mapproxy/mapproxy_seed_progress
  seed_command: mapproxy-seed
  seed_concurrency: 5
  interrupt_grace_secs: 10

job_tracker:
  url: http://localhost:8090

seeding:
  max_attempts: 5
  graceful_reload_max_seconds: 0
  refresh_before_years_offset: 1
  invalid_bbox_retry_limit: 3
  invalid_bbox_buffer_meters: 600
  unsupported_mode_retryable: true

http:
  timeout_secs: 30
  retry_attempts: 5
  retry_delay_ms: 500
  exponential_backoff: true

logging:
  level: info
"#;
