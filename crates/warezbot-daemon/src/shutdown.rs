//! OS signal handling for graceful shutdown.
//!
//! SIGINT, SIGTERM and SIGHUP all trigger the same shutdown path. Handlers
//! are registered up front by [`ShutdownSignal::install`] so a failure to
//! register surfaces before the server starts.

use tracing::info;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Registered shutdown signal handlers.
pub struct ShutdownSignal {
    #[cfg(unix)]
    interrupt: Signal,
    #[cfg(unix)]
    terminate: Signal,
    #[cfg(unix)]
    hangup: Signal,
}

impl ShutdownSignal {
    /// Register the handlers.
    pub fn install() -> std::io::Result<Self> {
        #[cfg(unix)]
        {
            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
                hangup: signal(SignalKind::hangup())?,
            })
        }

        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Resolve once the first shutdown signal arrives.
    pub async fn recv(mut self) {
        #[cfg(unix)]
        {
            let name = tokio::select! {
                _ = self.interrupt.recv() => "SIGINT",
                _ = self.terminate.recv() => "SIGTERM",
                _ = self.hangup.recv() => "SIGHUP",
            };
            info!("Received {}, stopping execution", name);
        }

        #[cfg(not(unix))]
        {
            let _ = &mut self;
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Ctrl+C handler failed, shutting down: {}", e);
                return;
            }
            info!("Received Ctrl+C, stopping execution");
        }
    }
}
