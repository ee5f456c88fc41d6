//! Outbound chat message model (Slack legacy attachments).

use serde::Serialize;

/// Text plus attachments, serialized in Slack's `chat.postMessage` shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutboundMessage {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Attachment {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub color: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fallback: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub callback_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub author_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub author_icon: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub footer: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<AttachmentField>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<AttachmentAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttachmentField {
    pub title: String,
    pub value: String,
    pub short: bool,
}

impl AttachmentField {
    pub fn new(title: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            short: false,
        }
    }
}

/// A message button.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttachmentAction {
    pub name: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm: Option<Confirmation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Confirmation {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismiss_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_fields_are_omitted() {
        let message = OutboundMessage::text("pong").with_attachment(Attachment {
            color: "a1b2c3".into(),
            author_name: "warezbot".into(),
            ..Default::default()
        });
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "text": "pong",
                "attachments": [{ "color": "a1b2c3", "author_name": "warezbot" }]
            })
        );
    }

    #[test]
    fn test_button_serializes_type() {
        let action = AttachmentAction {
            name: "603".into(),
            text: "1.) The Matrix - 1999".into(),
            kind: "button".into(),
            value: "1.) The Matrix - 1999".into(),
            confirm: None,
        };
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["type"], "button");
        assert!(value.get("confirm").is_none());
    }
}
