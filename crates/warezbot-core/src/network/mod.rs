//! REST clients for the downstream collaborators.
//!
//! This module provides:
//! - A shared JSON-over-HTTP client with timeout and status mapping
//! - The Slack messenger
//! - The Emby media server client
//! - The Radarr acquisition client

mod client;
mod emby;
mod radarr;
mod slack;

pub use client::{base_url, endpoint, extract_domain, HttpClient};
pub use emby::EmbyClient;
pub use radarr::RadarrClient;
pub use slack::SlackClient;
