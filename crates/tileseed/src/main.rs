//! tileseed - tile cache seeding worker

mod cli;
mod exit_codes;

use std::path::{Path, PathBuf};

use clap::Parser;
use tileseed_core::config::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.execute()
}

/// Set up tracing with two layers:
/// - Console: `--log-level`, then RUST_LOG, then the configured level
/// - File: debug-level JSON, rolled daily, when a log directory is configured
pub(crate) fn init_tracing(
    logging: &LoggingConfig,
    level_override: Option<&str>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let console_filter = match level_override {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level)),
    };

    if let Some(log_dir) = log_directory(logging) {
        let file_appender = tracing_appender::rolling::daily(&log_dir, "tileseed.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_filter(console_filter),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_target(true)
                    .with_filter(EnvFilter::new("debug")),
            )
            .init();

        return Some(guard);
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_filter(console_filter),
        )
        .init();

    None
}

/// Returns the configured log directory, creating it if needed.
fn log_directory(logging: &LoggingConfig) -> Option<PathBuf> {
    let log_dir = expand_home(logging.directory.as_deref()?)?;
    std::fs::create_dir_all(&log_dir).ok()?;
    Some(log_dir)
}

/// Expand a leading `~` to the home directory
fn expand_home(path: &Path) -> Option<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => Some(dirs::home_dir()?.join(rest)),
        Err(_) => Some(path.to_path_buf()),
    }
}
