//! Check-config command

use clap::Args;
use tracing::info;

use crate::cli::output::{self, Section, Status};
use crate::cli::{Cli, OutputFormat};
use crate::exit_codes;

/// Load and validate the configuration
#[derive(Debug, Args)]
pub struct CheckConfigCommand {}

impl CheckConfigCommand {
    /// Execute the check-config command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let (config, path) = match cli.load_config() {
            Ok(loaded) => loaded,
            Err(e) => {
                output::status(Status::Failed, &format!("Configuration: {:#}", e));
                std::process::exit(exit_codes::CONFIG_ERROR);
            }
        };
        let _guard = crate::init_tracing(&config.logging, cli.log_level.as_deref());
        info!(path = %path.display(), "configuration is valid");

        match cli.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "valid": true,
                    "config_path": path.to_string_lossy(),
                    "config": config,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                let section = Section::new("Configuration")
                    .row("file", path.display())
                    .row("job manager", &config.queue.job_manager_url)
                    .row("heartbeat", &config.queue.heartbeat_url)
                    .row("job tracker", &config.job_tracker.url)
                    .row("mapproxy api", &config.mapproxy.api_url)
                    .row(
                        "task type",
                        format!("{}/{}", config.queue.job_type, config.queue.task_type),
                    )
                    .row(
                        "seed command",
                        format!(
                            "{} (concurrency {})",
                            config.mapproxy.seed_command, config.mapproxy.seed_concurrency
                        ),
                    )
                    .row(
                        "bbox retries",
                        format!(
                            "{} x {}m",
                            config.seeding.invalid_bbox_retry_limit,
                            config.seeding.invalid_bbox_buffer_meters
                        ),
                    );
                println!("{}", section.render());
                output::status(Status::Ok, "Configuration is valid");
            }
        }

        Ok(())
    }
}
