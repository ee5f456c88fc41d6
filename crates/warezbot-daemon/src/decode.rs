//! Per-route request body decoders.
//!
//! - Message webhook: JSON body
//! - Interaction webhook: URL-encoded body whose `payload` value is JSON
//! - Media webhook: multipart body with a JSON part
//!
//! Each decoder reads at most `ServerConfig::MAX_BODY_BYTES` and logs the raw
//! body at debug level before parsing.

use axum::body::{Body, Bytes};
use axum::http::{header::CONTENT_TYPE, HeaderMap};
use mime::Mime;
use multer::{Constraints, Multipart, SizeLimit};
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;
use tracing::debug;
use warezbot_core::config::ServerConfig;
use warezbot_core::{InteractionEvent, MediaEvent, MessageEvent};

/// Where in the decoding pipeline a request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    Read,
    Unescape,
    Parse,
    ContentType,
    Part,
}

impl DecodeStage {
    pub fn as_str(self) -> &'static str {
        match self {
            DecodeStage::Read => "read",
            DecodeStage::Unescape => "unescape",
            DecodeStage::Parse => "parse",
            DecodeStage::ContentType => "content-type",
            DecodeStage::Part => "part",
        }
    }
}

impl fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("{stage} stage: {message}")]
pub struct DecodeError {
    pub stage: DecodeStage,
    pub message: String,
}

impl DecodeError {
    pub fn new(stage: DecodeStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// Read the whole body, failing past the size cap.
pub async fn read_body(body: Body) -> Result<Bytes, DecodeError> {
    axum::body::to_bytes(body, ServerConfig::MAX_BODY_BYTES)
        .await
        .map_err(|e| DecodeError::new(DecodeStage::Read, format!("error reading request body: {}", e)))
}

/// Decode a message webhook body.
pub async fn decode_message_event(body: Body) -> Result<MessageEvent, DecodeError> {
    let bytes = read_body(body).await?;
    parse_message_event(&bytes)
}

pub fn parse_message_event(bytes: &[u8]) -> Result<MessageEvent, DecodeError> {
    debug!("Message event body: {}", String::from_utf8_lossy(bytes));
    serde_json::from_slice(bytes).map_err(|e| {
        DecodeError::new(DecodeStage::Parse, format!("invalid message event: {}", e))
    })
}

/// Decode an interaction webhook body.
pub async fn decode_interaction(body: Body) -> Result<InteractionEvent, DecodeError> {
    let bytes = read_body(body).await?;
    parse_interaction(&bytes)
}

/// Unescape the whole body, drop a leading `payload=` and parse the rest.
///
/// This is not a form parser: it assumes `payload` is the first and only
/// field, which is what Slack sends for legacy message buttons.
pub fn parse_interaction(bytes: &[u8]) -> Result<InteractionEvent, DecodeError> {
    let raw = std::str::from_utf8(bytes).map_err(|e| {
        DecodeError::new(DecodeStage::Unescape, format!("body is not UTF-8: {}", e))
    })?;
    let unescaped = query_unescape(raw)?;
    debug!("Interaction body: {}", unescaped);
    let payload = unescaped.strip_prefix("payload=").unwrap_or(&unescaped);
    serde_json::from_str(payload).map_err(|e| {
        DecodeError::new(DecodeStage::Parse, format!("invalid interaction payload: {}", e))
    })
}

/// Query-string unescaping: `+` is a space and every `%` must start a valid
/// two-digit hex escape.
pub fn query_unescape(raw: &str) -> Result<String, DecodeError> {
    let bytes = raw.as_bytes();
    for (index, _) in raw.match_indices('%') {
        let valid = bytes
            .get(index + 1..index + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !valid {
            return Err(DecodeError::new(
                DecodeStage::Unescape,
                format!("invalid URL escape at byte {}", index),
            ));
        }
    }
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(Cow::into_owned)
        .map_err(|e| DecodeError::new(DecodeStage::Unescape, format!("invalid escaped text: {}", e)))
}

/// Decode a media webhook body.
///
/// A non-multipart content type yields an empty event without error. For a
/// multipart body every part is parsed as JSON and the last one wins.
pub async fn decode_media_event(headers: &HeaderMap, body: Body) -> Result<MediaEvent, DecodeError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let media_type: Mime = content_type.parse().map_err(|e| {
        DecodeError::new(
            DecodeStage::ContentType,
            format!("not a valid media event content type {:?}: {}", content_type, e),
        )
    })?;

    if media_type.type_() != mime::MULTIPART {
        debug!("Media event with {} content type, nothing to decode", media_type);
        return Ok(MediaEvent::default());
    }

    let boundary = media_type
        .get_param(mime::BOUNDARY)
        .map(|boundary| boundary.as_str().to_string())
        .ok_or_else(|| DecodeError::new(DecodeStage::ContentType, "multipart body without boundary"))?;

    let constraints = Constraints::new()
        .size_limit(SizeLimit::new().whole_stream(ServerConfig::MAX_BODY_BYTES as u64));
    let mut multipart = Multipart::with_constraints(body.into_data_stream(), boundary, constraints);

    let mut event = MediaEvent::default();
    while let Some(field) = multipart.next_field().await.map_err(part_error)? {
        let data = field.bytes().await.map_err(part_error)?;
        debug!("Media event part: {}", String::from_utf8_lossy(&data));
        event = serde_json::from_slice(&data).map_err(|e| {
            DecodeError::new(DecodeStage::Parse, format!("invalid media event part: {}", e))
        })?;
    }
    Ok(event)
}

fn part_error(err: multer::Error) -> DecodeError {
    DecodeError::new(DecodeStage::Part, format!("error reading multipart body: {}", err))
}
