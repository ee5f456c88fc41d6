//! Error types for warezbot.
//!
//! `WarezError` covers every failure a collaborator call or the configuration
//! loader can produce. Synchronous dispatch branches hand it back to the HTTP
//! layer; detached tasks only log it.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the warezbot core.
#[derive(Debug, Error)]
pub enum WarezError {
    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("{service} API error (status {status}): {message}")]
    Api {
        service: String,
        status: u16,
        message: String,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{what} not found: {id}")]
    NotFound { what: String, id: String },

    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for warezbot operations.
pub type Result<T> = std::result::Result<T, WarezError>;

impl From<std::io::Error> for WarezError {
    fn from(err: std::io::Error) -> Self {
        WarezError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for WarezError {
    fn from(err: serde_json::Error) -> Self {
        WarezError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for WarezError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            WarezError::Timeout(crate::config::NetworkConfig::REQUEST_TIMEOUT)
        } else {
            WarezError::Network {
                message: err.to_string(),
                source: Some(err),
            }
        }
    }
}

impl WarezError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        WarezError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        WarezError::Config {
            message: message.into(),
        }
    }

    /// True when the failure came from a remote collaborator rather than
    /// local configuration or I/O.
    pub fn is_downstream(&self) -> bool {
        matches!(
            self,
            WarezError::Network { .. }
                | WarezError::Timeout(_)
                | WarezError::Api { .. }
                | WarezError::NotFound { .. }
        )
    }
}
