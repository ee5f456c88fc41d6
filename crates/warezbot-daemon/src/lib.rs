//! Warezbot webhook daemon.
//!
//! Terminates TLS, decodes Slack and Emby webhook bodies, hands them to the
//! [`warezbot_core::Dispatcher`] and encodes the reply.

pub mod decode;
pub mod encode;
pub mod error;
pub mod logging;
pub mod routes;
pub mod server;
pub mod shutdown;

pub use error::{DaemonError, WebhookError};
pub use routes::build_router;
pub use server::{HttpsDaemon, Timeouts, TlsMaterial};
