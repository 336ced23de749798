//! Configuration validation

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::WorkerConfig;

/// Validate configuration
pub fn validate_config(config: &WorkerConfig) -> Result<()> {
    debug!("validating configuration");
    validate_urls(config)?;
    validate_mapproxy(config)?;
    validate_seeding(config)?;
    validate_queue(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
}

fn validate_urls(config: &WorkerConfig) -> Result<()> {
    let urls = [
        ("queue.job_manager_url", &config.queue.job_manager_url),
        ("queue.heartbeat_url", &config.queue.heartbeat_url),
        ("mapproxy.api_url", &config.mapproxy.api_url),
        ("job_tracker.url", &config.job_tracker.url),
    ];

    for (field, url) in urls {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(invalid(field, "must be an http:// or https:// URL").into());
        }
    }

    Ok(())
}

fn validate_mapproxy(config: &WorkerConfig) -> Result<()> {
    let mapproxy = &config.mapproxy;

    if mapproxy.seed_command.trim().is_empty() {
        return Err(invalid("mapproxy.seed_command", "command cannot be empty").into());
    }

    if mapproxy.seed_concurrency == 0 {
        return Err(invalid("mapproxy.seed_concurrency", "must be at least 1").into());
    }

    let paths = [
        ("mapproxy.config_path", &mapproxy.config_path),
        ("mapproxy.seed_spec_path", &mapproxy.seed_spec_path),
        ("mapproxy.coverage_path", &mapproxy.coverage_path),
    ];
    for (field, path) in paths {
        if path.as_os_str().is_empty() {
            return Err(invalid(field, "path cannot be empty").into());
        }
    }

    if mapproxy.config_path == mapproxy.seed_spec_path
        || mapproxy.config_path == mapproxy.coverage_path
        || mapproxy.seed_spec_path == mapproxy.coverage_path
    {
        return Err(invalid("mapproxy", "working file paths must be distinct").into());
    }

    if mapproxy.progress_file_prefix.is_empty() {
        return Err(invalid("mapproxy.progress_file_prefix", "prefix cannot be empty").into());
    }

    Ok(())
}

fn validate_seeding(config: &WorkerConfig) -> Result<()> {
    let buffer = config.seeding.invalid_bbox_buffer_meters;
    if !buffer.is_finite() || buffer <= 0.0 {
        return Err(invalid(
            "seeding.invalid_bbox_buffer_meters",
            "must be a positive number of meters",
        )
        .into());
    }

    Ok(())
}

fn validate_queue(config: &WorkerConfig) -> Result<()> {
    if config.queue.job_type.is_empty() || config.queue.task_type.is_empty() {
        return Err(invalid("queue", "job_type and task_type cannot be empty").into());
    }

    if config.queue.heartbeat_interval_ms == 0 {
        return Err(invalid("queue.heartbeat_interval_ms", "must be greater than 0").into());
    }

    Ok(())
}
