//! Keyword command dispatch.
//!
//! The dispatcher decides, per inbound event, which downstream actions to
//! trigger and what to answer the webhook caller right away. Fast actions run
//! inline and their failures fail the request; slow ones are handed to the
//! [`TaskLauncher`] and only ever logged.

use crate::collaborators::{Acquisition, MediaServer, Messenger};
use crate::config::NotifyConfig;
use crate::events::{InboundEvent, InteractionEvent, MediaEvent, MessageEvent, INTERACTIVE_MESSAGE};
use crate::notify;
use crate::tasks::TaskLauncher;
use crate::Result;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Status the webhook caller receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// 200 with a JSON body.
    Ok,
    /// 202 with no body.
    Accepted,
}

impl DispatchStatus {
    pub fn code(self) -> u16 {
        match self {
            DispatchStatus::Ok => 200,
            DispatchStatus::Accepted => 202,
        }
    }
}

/// The synchronous answer to one webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    pub event_kind: String,
    pub status: DispatchStatus,
}

impl DispatchResult {
    pub fn ok(event_kind: impl Into<String>) -> Self {
        Self {
            event_kind: event_kind.into(),
            status: DispatchStatus::Ok,
        }
    }

    pub fn accepted() -> Self {
        Self {
            event_kind: String::new(),
            status: DispatchStatus::Accepted,
        }
    }

    /// Accepted results never carry a body; everything else does.
    pub fn body_present(&self) -> bool {
        self.status != DispatchStatus::Accepted
    }
}

/// A command recognized in a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    NowPlaying,
    AddMovie { terms: Vec<String> },
    Search { terms: Vec<String> },
}

/// Scan message text for commands.
///
/// Keywords are matched by case-sensitive substring, independently and in a
/// fixed order, so one message can yield several commands. `add movie` needs
/// at least four whitespace tokens and searches with tokens 3..; `search`
/// needs at least three and searches with tokens 2.. (token 0 is the mention).
pub fn parse_commands(text: &str) -> Vec<Command> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let tail = |from: usize| -> Vec<String> { tokens[from..].iter().map(|t| t.to_string()).collect() };
    let mut commands = Vec::new();

    if text.contains("ping") {
        commands.push(Command::Ping);
    }
    if text.contains("now playing") {
        commands.push(Command::NowPlaying);
    }
    if text.contains("add movie") {
        if tokens.len() >= 4 {
            commands.push(Command::AddMovie { terms: tail(3) });
        } else {
            debug!("Ignoring \"add movie\" with {} tokens", tokens.len());
        }
    }
    if text.contains("search") {
        if tokens.len() >= 3 {
            commands.push(Command::Search { terms: tail(2) });
        } else {
            debug!("Ignoring \"search\" with {} tokens", tokens.len());
        }
    }
    commands
}

/// Routes decoded events to collaborators.
pub struct Dispatcher {
    messenger: Arc<dyn Messenger>,
    media: Arc<dyn MediaServer>,
    acquisition: Arc<dyn Acquisition>,
    tasks: TaskLauncher,
}

impl Dispatcher {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        media: Arc<dyn MediaServer>,
        acquisition: Arc<dyn Acquisition>,
        tasks: TaskLauncher,
    ) -> Self {
        Self {
            messenger,
            media,
            acquisition,
            tasks,
        }
    }

    /// The launcher detached actions go through.
    pub fn tasks(&self) -> &TaskLauncher {
        &self.tasks
    }

    /// Dispatch any inbound event variant.
    pub async fn dispatch(&self, event: &InboundEvent) -> Result<DispatchResult> {
        debug!("Dispatching {} event", event.kind());
        match event {
            InboundEvent::Message(event) => self.dispatch_message(event).await,
            InboundEvent::Interaction(event) => Ok(self.dispatch_interaction(event)),
            InboundEvent::Media(event) => self.dispatch_media(event).await,
        }
    }

    /// Handle a message event. Always answers 200 with the inner event type
    /// unless a synchronous command fails.
    pub async fn dispatch_message(&self, event: &MessageEvent) -> Result<DispatchResult> {
        if !event.is_mention() {
            debug!("Skipping {} event, bot not mentioned", event.event.kind);
            return Ok(DispatchResult::ok(&event.event.kind));
        }

        for command in parse_commands(&event.event.text) {
            match command {
                Command::Ping => {
                    self.messenger.post_message(&notify::pong()).await?;
                }
                Command::NowPlaying => {
                    let sessions = self.media.active_sessions().await.map_err(|e| {
                        error!("Failed to fetch active sessions: {}", e);
                        e
                    })?;
                    self.messenger
                        .post_message(&notify::now_playing(&sessions))
                        .await?;
                }
                Command::AddMovie { terms } => {
                    let acquisition = self.acquisition.clone();
                    let messenger = self.messenger.clone();
                    self.tasks.launch("movie_search", async move {
                        let movies = acquisition.search(&terms).await?;
                        messenger
                            .post_message(&notify::movie_candidates(&terms, &movies))
                            .await?;
                        Ok(())
                    });
                }
                Command::Search { terms } => {
                    let media = self.media.clone();
                    let messenger = self.messenger.clone();
                    self.tasks.launch("library_search", async move {
                        let hints = media.search(&terms).await?;
                        messenger.post_message(&notify::media_search(&hints)).await?;
                        Ok(())
                    });
                }
            }
        }

        Ok(DispatchResult::ok(&event.event.kind))
    }

    /// Handle a button click. Always answers 202; a download prompt click
    /// starts the download in the background.
    pub fn dispatch_interaction(&self, event: &InteractionEvent) -> DispatchResult {
        if event.kind != INTERACTIVE_MESSAGE
            || event.callback_id != NotifyConfig::DOWNLOAD_PROMPT_CALLBACK
        {
            debug!(
                "Ignoring interaction {} with callback {}",
                event.kind, event.callback_id
            );
            return DispatchResult::accepted();
        }

        let Some(action) = event.actions.first().cloned() else {
            warn!("Download prompt interaction carried no actions");
            return DispatchResult::accepted();
        };

        let messenger = self.messenger.clone();
        let acquisition = self.acquisition.clone();
        let ts = event.origin_ts().to_string();
        let user = event.user.name.clone();
        self.tasks.launch("movie_download", async move {
            // A failed prompt update does not cancel the download.
            if let Err(e) = messenger
                .update_message(&ts, &notify::download_started(&user, &action.value))
                .await
            {
                warn!("Failed to update download prompt {}: {}", ts, e);
            }
            let added = acquisition.download(&action.name).await?;
            info!(
                "Added {} ({}) as movie {} requested by {}",
                added.title, added.year, added.id, user
            );
            Ok(())
        });

        DispatchResult::accepted()
    }

    /// Relay a media-server event to the chat channel.
    pub async fn dispatch_media(&self, event: &MediaEvent) -> Result<DispatchResult> {
        self.messenger
            .post_message(&notify::media_event(event))
            .await
            .map_err(|e| {
                error!("Failed to post media event {}: {}", event.event, e);
                e
            })?;
        Ok(DispatchResult::ok(&event.event))
    }
}
