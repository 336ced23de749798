//! Error types for tileseed core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

/// Top-level error for core operations
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Task precondition failures
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Worker configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// A task or sub-task failed a precondition.
///
/// Every variant is raised before any working file is written or any
/// process is started, and none of them can succeed on a retry of the same
/// payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The task asks for a backing store this worker does not seed
    #[error("Unsupported cache type {0}")]
    UnsupportedCacheType(String),

    /// The task parameters could not be decoded
    #[error("Malformed task parameters: {0}")]
    MalformedParameters(String),

    /// fromZoomLevel is greater than toZoomLevel
    #[error("from zoom level value cannot be bigger than to zoom level value")]
    InvalidZoomRange { from: u32, to: u32 },

    /// A zoom level outside the range the seed specification accepts
    #[error("zoom level {level} is out of range, must be between 0 and {max}")]
    ZoomOutOfRange { level: u32, max: u32 },

    /// refreshBefore is not an ISO-8601 timestamp
    #[error("Date string must be 'ISO_8601' format: yyyy-MM-dd'T'HH:mm:ss, for example: 2023-11-07T12:35:00")]
    InvalidDate(String),

    /// The layer's cache is backed by something other than the supported store
    #[error("Cache type should be of type Redis")]
    UnsupportedBackingStore { layer: String, found: Option<String> },

    /// The layer has no cache entry in the proxy configuration
    #[error("Cache: {0} not exist on mapproxy config")]
    CacheNotFound(String),

    /// The grid is not declared in the proxy configuration
    #[error("Grid: {0} not exist on mapproxy config")]
    GridNotFound(String),

    /// The generated seed specification failed its schema check
    #[error("Invalid seed specification: {field} - {message}")]
    InvalidSpec { field: String, message: String },
}
