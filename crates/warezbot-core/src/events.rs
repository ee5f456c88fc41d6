//! Canonical inbound event types.
//!
//! Each webhook route decodes into exactly one of these payloads. Every field
//! defaults when absent so that partially populated platform payloads still
//! decode.

use serde::{Deserialize, Serialize};

/// Inner event type Slack uses when the bot is addressed directly.
pub const APP_MENTION: &str = "app_mention";

/// Interaction type Slack uses for legacy message button clicks.
pub const INTERACTIVE_MESSAGE: &str = "interactive_message";

/// One decoded webhook payload.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Message(MessageEvent),
    Interaction(InteractionEvent),
    Media(MediaEvent),
}

impl InboundEvent {
    /// The payload's own type tag. For message events this is the inner
    /// event's type, not the envelope's.
    pub fn kind(&self) -> &str {
        match self {
            InboundEvent::Message(event) => &event.event.kind,
            InboundEvent::Interaction(event) => &event.kind,
            InboundEvent::Media(event) => &event.event,
        }
    }
}

/// Slack Events API envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageEvent {
    pub token: String,
    pub team_id: String,
    pub api_app_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub event_id: String,
    pub event_time: i64,
    pub authed_users: Vec<String>,
    pub event: MessageBody,
}

/// The inner `event` object of a Slack envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub subtype: String,
    pub text: String,
    pub ts: String,
    pub user: String,
    pub username: String,
    pub bot_id: String,
    pub channel: String,
    pub channel_type: String,
    pub event_ts: String,
}

impl MessageEvent {
    /// Whether the inner event addresses the bot.
    pub fn is_mention(&self) -> bool {
        self.event.kind == APP_MENTION
    }
}

/// Slack interactive-message callback (button click).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub actions: Vec<InteractionAction>,
    pub callback_id: String,
    pub team: Team,
    pub channel: Channel,
    pub user: User,
    pub action_ts: String,
    pub message_ts: String,
    pub attachment_id: String,
    pub token: String,
    pub is_app_unfurl: bool,
    pub original_message: OriginalMessage,
    pub response_url: String,
    pub trigger_id: String,
}

/// A button the user pressed. `name` carries the catalog id, `value` the
/// display text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionAction {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Team {
    pub id: String,
    pub domain: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Channel {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginalMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub subtype: String,
    pub text: String,
    pub ts: String,
    pub username: String,
    pub bot_id: String,
}

impl InteractionEvent {
    /// Timestamp of the message that carried the clicked button.
    pub fn origin_ts(&self) -> &str {
        if self.original_message.ts.is_empty() {
            &self.message_ts
        } else {
            &self.original_message.ts
        }
    }
}

/// Emby webhook notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MediaEvent {
    pub title: String,
    pub event: String,
    pub user: MediaUser,
    pub item: MediaItem,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MediaUser {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MediaItem {
    pub name: String,
    pub id: String,
    #[serde(rename = "Type")]
    pub kind: String,
    pub external_urls: Vec<ExternalUrl>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ExternalUrl {
    pub name: String,
    pub url: String,
}

impl MediaEvent {
    /// First external link for the item, if Emby sent one.
    pub fn external_url(&self) -> Option<&str> {
        self.item
            .external_urls
            .first()
            .map(|link| link.url.as_str())
            .filter(|url| !url.is_empty())
    }
}
