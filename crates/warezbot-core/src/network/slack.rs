//! Slack Web API client (`chat.postMessage` / `chat.update`).

use super::client::{base_url, endpoint, HttpClient};
use crate::collaborators::Messenger;
use crate::config::SlackSettings;
use crate::message::OutboundMessage;
use crate::{Result, WarezError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    #[serde(flatten)]
    message: &'a OutboundMessage,
}

#[derive(Serialize)]
struct UpdateMessage<'a> {
    channel: &'a str,
    ts: &'a str,
    #[serde(flatten)]
    message: &'a OutboundMessage,
}

/// Slack replies 200 even on failure and reports it through `ok`.
#[derive(Deserialize)]
struct SlackReply {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

impl SlackReply {
    fn into_result(self) -> Result<Option<String>> {
        if self.ok {
            Ok(self.ts)
        } else {
            Err(WarezError::Api {
                service: "slack".into(),
                status: 200,
                message: self.error.unwrap_or_else(|| "unknown_error".into()),
            })
        }
    }
}

/// Posts to one channel as the bot user.
pub struct SlackClient {
    http: HttpClient,
    api: Url,
    authorization: String,
    channel: String,
}

impl SlackClient {
    pub fn new(settings: &SlackSettings) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new("slack")?,
            api: base_url(&settings.api_url)?,
            authorization: format!("Bearer {}", settings.bot_token),
            channel: settings.channel_id.clone(),
        })
    }
}

#[async_trait]
impl Messenger for SlackClient {
    async fn post_message(&self, content: &OutboundMessage) -> Result<String> {
        let reply: SlackReply = self
            .http
            .post_json(
                endpoint(&self.api, "chat.postMessage")?,
                &[("Authorization", self.authorization.as_str())],
                &PostMessage {
                    channel: &self.channel,
                    message: content,
                },
            )
            .await?;
        Ok(reply.into_result()?.unwrap_or_default())
    }

    async fn update_message(&self, ts: &str, content: &OutboundMessage) -> Result<()> {
        let reply: SlackReply = self
            .http
            .post_json(
                endpoint(&self.api, "chat.update")?,
                &[("Authorization", self.authorization.as_str())],
                &UpdateMessage {
                    channel: &self.channel,
                    ts,
                    message: content,
                },
            )
            .await?;
        reply.into_result().map(|_| ())
    }
}
