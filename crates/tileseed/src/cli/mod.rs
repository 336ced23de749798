//! CLI definition and command handling

pub mod commands;
pub mod output;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tileseed_core::config::{load_config, load_config_from_dir};
use tileseed_core::WorkerConfig;

use commands::{CheckConfigCommand, InitCommand, OnceCommand, RunCommand};

/// tileseed - tile cache seeding worker
#[derive(Debug, Parser)]
#[command(name = "tileseed")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file; searched upward from the working directory when omitted
    #[arg(short, long, global = true, env = "TILESEED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Console log filter, overrides RUST_LOG and the configured level
    #[arg(long, global = true, env = "TILESEED_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Poll the job queue and seed until interrupted
    Run(RunCommand),

    /// Handle at most one pending task and exit
    Once(OnceCommand),

    /// Load and validate the configuration
    CheckConfig(CheckConfigCommand),

    /// Print or write a default configuration
    Init(InitCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Run(ref cmd) => cmd.execute(&self),
            Commands::Once(ref cmd) => cmd.execute(&self),
            Commands::CheckConfig(ref cmd) => cmd.execute(&self),
            Commands::Init(ref cmd) => cmd.execute(&self),
        }
    }

    /// Load the configuration named by `--config`, or search for one
    pub fn load_config(&self) -> anyhow::Result<(WorkerConfig, PathBuf)> {
        match &self.config {
            Some(path) => {
                let config = load_config(path)
                    .with_context(|| format!("failed to load {}", path.display()))?;
                Ok((config, path.clone()))
            }
            None => {
                let cwd = std::env::current_dir()?;
                Ok(load_config_from_dir(&cwd)?)
            }
        }
    }
}
