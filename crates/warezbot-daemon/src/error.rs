//! Error types for the daemon.

use crate::decode::DecodeError;
use crate::encode::EncodeError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::time::Duration;
use thiserror::Error;
use tracing::error;
use warezbot_core::WarezError;

/// A failed webhook request.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("downstream error: {0}")]
    Downstream(#[from] WarezError),
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::Decode(_) => StatusCode::BAD_REQUEST,
            WebhookError::Encode(_) | WebhookError::Downstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            WebhookError::Decode(e) => error!(stage = %e.stage, "{}", self),
            _ => error!("{}", self),
        }
        (status, self.to_string()).into_response()
    }
}

/// Daemon construction and lifecycle failures.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] std::io::Error),

    #[error("graceful shutdown did not finish within {0:?}; remaining connections were closed")]
    ShutdownTimedOut(Duration),
}
