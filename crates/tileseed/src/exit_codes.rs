//! Exit codes for the CLI

/// Success
pub const SUCCESS: i32 = 0;

/// Configuration could not be loaded or is invalid
pub const CONFIG_ERROR: i32 = 2;

/// `once` found no pending task
pub const IDLE: i32 = 3;
