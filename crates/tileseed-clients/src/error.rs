//! Client error types

use thiserror::Error;

/// Errors talking to an external service
#[derive(Debug, Error)]
pub enum ClientError {
    /// The service answered with a non-success status
    #[error("{service} API error: {status} - {message}")]
    ApiError {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// The requested resource does not exist
    #[error("{service}: resource not found at {url}")]
    NotFound { service: &'static str, url: String },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ClientError {
    /// Whether the service reported the resource as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
