//! warezbot core - headless event model and command dispatch.
//!
//! This crate owns everything that decides what the bot does: the canonical
//! inbound events, the keyword dispatcher, the detached task launcher, the
//! chat notification builder and the collaborator clients. It has no HTTP
//! server; see `warezbot-daemon` for that.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use warezbot_core::{Dispatcher, Settings, TaskLauncher};
//! use warezbot_core::network::{EmbyClient, RadarrClient, SlackClient};
//!
//! let settings = Settings::load("./daemon/config.json")?;
//! let dispatcher = Dispatcher::new(
//!     Arc::new(SlackClient::new(&settings.slack)?),
//!     Arc::new(EmbyClient::new(&settings.emby)?),
//!     Arc::new(RadarrClient::new(&settings.radarr)?),
//!     TaskLauncher::new(settings.max_detached_tasks),
//! );
//! ```

pub mod collaborators;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod message;
pub mod network;
pub mod notify;
pub mod tasks;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

// Re-export commonly used types
pub use collaborators::{
    Acquisition, AddedMovie, MediaServer, Messenger, MovieCandidate, SearchHint, Session,
};
pub use config::Settings;
pub use dispatch::{Command, DispatchResult, DispatchStatus, Dispatcher};
pub use error::{Result, WarezError};
pub use events::{InboundEvent, InteractionEvent, MediaEvent, MessageEvent};
pub use message::OutboundMessage;
pub use tasks::TaskLauncher;
