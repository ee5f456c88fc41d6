//! Logging setup: compact stderr output plus a JSON request log file.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing::warn;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Target of the per-request span and completion event.
pub const REQUEST_LOG_TARGET: &str = "warezbot::request";

/// Map a configured level name to a filter. Unknown names mean `warn`.
pub fn level_from_name(name: &str) -> LevelFilter {
    match name.trim().to_ascii_lowercase().as_str() {
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "error" => LevelFilter::ERROR,
        _ => LevelFilter::WARN,
    }
}

fn open_request_log(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber.
///
/// The request log receives only `warezbot::request` records as JSON lines.
/// A request log that cannot be opened is reported and skipped.
pub fn init(level: LevelFilter, request_log: &Path) {
    let console = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_filter(level);

    let (request_layer, open_error) = match open_request_log(request_log) {
        Ok(file) => {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(Mutex::new(file))
                .with_filter(Targets::new().with_target(REQUEST_LOG_TARGET, LevelFilter::INFO));
            (Some(layer), None)
        }
        Err(e) => (None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(request_layer)
        .init();

    if let Some(e) = open_error {
        warn!(
            "Request log {} unavailable, requests are not logged to file: {}",
            request_log.display(),
            e
        );
    }
}
