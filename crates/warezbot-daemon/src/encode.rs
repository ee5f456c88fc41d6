//! Wire responses per route.

use axum::http::{header::CONTENT_TYPE, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use warezbot_core::{DispatchResult, DispatchStatus};

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Body of the message and media webhook replies.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventResponse<'a> {
    pub event_type: &'a str,
    pub status_code: u16,
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("endpoint response error: result with status {0} carries no body")]
    MissingBody(u16),

    #[error("endpoint response error: expected status 202, got {0}")]
    UnexpectedStatus(u16),

    #[error("failed to serialize response: {0}")]
    Json(#[from] serde_json::Error),
}

/// 200 with `{"EventType", "StatusCode"}` and a trailing newline.
pub fn encode_event_response(result: &DispatchResult) -> Result<Response, EncodeError> {
    if !result.body_present() {
        return Err(EncodeError::MissingBody(result.status.code()));
    }
    let mut body = serde_json::to_vec(&EventResponse {
        event_type: &result.event_kind,
        status_code: result.status.code(),
    })?;
    body.push(b'\n');
    Ok((StatusCode::OK, [(CONTENT_TYPE, JSON_CONTENT_TYPE)], body).into_response())
}

/// Exactly the dispatch status with an empty body.
///
/// Anything other than 202 is a contract violation; it is logged and the
/// status is still written.
pub fn encode_accepted_response(result: &DispatchResult) -> Response {
    let code = result.status.code();
    if result.status != DispatchStatus::Accepted {
        error!("{}", EncodeError::UnexpectedStatus(code));
    }
    StatusCode::from_u16(code)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        .into_response()
}
