//! Webhook routes: decoder, dispatcher and encoder wired per path.

use crate::decode;
use crate::encode;
use crate::error::WebhookError;
use crate::logging::REQUEST_LOG_TARGET;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::Span;
use warezbot_core::config::RouteConfig;
use warezbot_core::{Dispatcher, InboundEvent};

/// Application state shared across handlers.
pub struct AppState {
    pub dispatcher: Dispatcher,
}

/// Build the webhook router. `message_path` is the configurable message
/// webhook path; the other two are fixed.
pub fn build_router(dispatcher: Dispatcher, message_path: &str) -> Router {
    let state = Arc::new(AppState { dispatcher });

    Router::new()
        .route(message_path, post(handle_message_event))
        .route(RouteConfig::INTERACTION_PATH, post(handle_interaction))
        .route(RouteConfig::MEDIA_EVENTS_PATH, post(handle_media_event))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        target: REQUEST_LOG_TARGET,
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                })
                .on_request(())
                .on_response(|response: &Response, latency: Duration, _span: &Span| {
                    tracing::info!(
                        target: REQUEST_LOG_TARGET,
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis() as u64,
                        "request completed"
                    );
                }),
        )
        .with_state(state)
}

async fn handle_message_event(
    State(state): State<Arc<AppState>>,
    body: Body,
) -> Result<Response, WebhookError> {
    let event = InboundEvent::Message(decode::decode_message_event(body).await?);
    let result = state.dispatcher.dispatch(&event).await?;
    Ok(encode::encode_event_response(&result)?)
}

async fn handle_interaction(
    State(state): State<Arc<AppState>>,
    body: Body,
) -> Result<Response, WebhookError> {
    let event = InboundEvent::Interaction(decode::decode_interaction(body).await?);
    let result = state.dispatcher.dispatch(&event).await?;
    Ok(encode::encode_accepted_response(&result))
}

async fn handle_media_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, WebhookError> {
    let event = InboundEvent::Media(decode::decode_media_event(&headers, body).await?);
    let result = state.dispatcher.dispatch(&event).await?;
    Ok(encode::encode_event_response(&result)?)
}
