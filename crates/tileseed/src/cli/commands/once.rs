//! Once command

use clap::Args;
use tracing::info;

use crate::cli::commands::run::build_dispatcher;
use crate::cli::output::{self, Status};
use crate::cli::{Cli, OutputFormat};
use crate::exit_codes;

/// Handle at most one pending task and exit
#[derive(Debug, Args)]
pub struct OnceCommand {}

impl OnceCommand {
    /// Execute the once command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let (config, config_path) = cli.load_config()?;
        let guard = crate::init_tracing(&config.logging, cli.log_level.as_deref());
        info!(config = %config_path.display(), "executing once command");

        let dispatcher = build_dispatcher(&config)?;
        let runtime = tokio::runtime::Runtime::new()?;
        let outcome = runtime.block_on(dispatcher.dispatch())?;

        match cli.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "handled": outcome.handled(),
                    "outcome": outcome.to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                if outcome.handled() {
                    output::status(Status::Ok, &format!("Task {}", outcome));
                } else {
                    output::status(Status::Idle, "No pending task");
                }
            }
        }

        drop(guard);
        if !outcome.handled() {
            std::process::exit(exit_codes::IDLE);
        }
        std::process::exit(exit_codes::SUCCESS);
    }
}
