//! Init command

use std::path::PathBuf;

use clap::Args;

use tileseed_core::config::DEFAULT_CONFIG_TEMPLATE;

use crate::cli::output::{self, Status};
use crate::cli::Cli;

/// Print or write a default configuration
#[derive(Debug, Args)]
pub struct InitCommand {
    /// Write the template to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Overwrite an existing file
    #[arg(short, long)]
    pub force: bool,
}

impl InitCommand {
    /// Execute the init command
    pub fn execute(&self, _cli: &Cli) -> anyhow::Result<()> {
        let Some(path) = &self.output else {
            print!("{}", DEFAULT_CONFIG_TEMPLATE);
            return Ok(());
        };

        write_template(path, self.force)?;
        output::status(Status::Ok, &format!("Created {}", path.display()));
        Ok(())
    }
}

fn write_template(path: &std::path::Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }
    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)?;
    Ok(())
}
