//! CLI commands

mod check_config;
mod init;
mod once;
mod run;

pub use check_config::CheckConfigCommand;
pub use init::InitCommand;
pub use once::OnceCommand;
pub use run::RunCommand;
