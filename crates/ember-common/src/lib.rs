//! Shared chat types for the Embercraft live chat pipeline.
//!
//! One WebSocket text frame from the relay is one JSON-encoded
//! [`ChatMessage`]. The history endpoint returns the same shape, and the
//! relay stores embeds/attachments as JSON text columns, so this crate is
//! the single source of truth for the wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error code the relay attaches when a bearer identity no longer resolves
/// to an account. Clients treat it as forced logout, never as a transient
/// failure.
pub const USER_NOT_FOUND_CODE: &str = "USER_NOT_FOUND";

/// A single chat message as shown on the website and in bridged clients.
///
/// `author_name`/`author_avatar` are a snapshot taken at send time, not a
/// live join against the users table, so display survives later identity
/// changes or account deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    /// Identifier assigned by the bridged platform when the message
    /// originated there (or was echoed back to it).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_id: Option<String>,
    pub author_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(author_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            upstream_id: None,
            author_name: author_name.into(),
            author_avatar: None,
            content: None,
            embeds: Vec::new(),
            attachments: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_upstream_id(mut self, upstream_id: impl Into<String>) -> Self {
        self.upstream_id = Some(upstream_id.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_avatar(mut self, url: impl Into<String>) -> Self {
        self.author_avatar = Some(url.into());
        self
    }

    pub fn with_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Identity test used for feed deduplication.
    ///
    /// Two messages are the same if their `id`s match, or if either side's
    /// `upstream_id` matches the other's `id`. The cross-match absorbs a
    /// message sent through the website and then echoed back by the bridge
    /// under the upstream identifier scheme.
    pub fn matches(&self, other: &ChatMessage) -> bool {
        if self.id == other.id {
            return true;
        }
        if let Some(up) = &self.upstream_id {
            if *up == other.id {
                return true;
            }
        }
        if let Some(up) = &other.upstream_id {
            if *up == self.id {
                return true;
            }
        }
        false
    }
}

/// Rich-content block attached to a message, mirroring the bridged
/// platform's embed shape. Validated by serde at the parse boundary; the
/// relay never inspects it beyond (de)serialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// 24-bit RGB accent color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedMedia>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedMedia>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedMedia {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// File attached to a message. Uploaded media lives on the bridged
/// platform's CDN; only the reference travels here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub filename: String,
    pub url: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Decode one inbound WebSocket text frame.
///
/// Malformed frames yield `None`; the connection stays up and the frame is
/// simply dropped.
pub fn parse_frame(text: &str) -> Option<ChatMessage> {
    serde_json::from_str(text).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: &str) -> ChatMessage {
        ChatMessage::new("steve").with_id(id).with_content("hi")
    }

    #[test]
    fn matches_on_equal_id() {
        assert!(msg("a").matches(&msg("a")));
        assert!(!msg("a").matches(&msg("b")));
    }

    #[test]
    fn matches_across_upstream_id_in_either_direction() {
        let local = msg("local-1");
        let echoed = msg("999000111").with_upstream_id("local-1");
        // Wrong way round on purpose: the rule is symmetric.
        assert!(local.matches(&echoed));
        assert!(echoed.matches(&local));

        let unrelated = msg("other").with_upstream_id("nope");
        assert!(!local.matches(&unrelated));
    }

    #[test]
    fn parse_frame_rejects_malformed_json() {
        assert!(parse_frame("{ not json").is_none());
        assert!(parse_frame("42").is_none());
    }

    #[test]
    fn parse_frame_accepts_minimal_message() {
        let text = r#"{
            "id": "1",
            "author_name": "Alex",
            "timestamp": "2025-11-02T10:00:00Z"
        }"#;
        let m = parse_frame(text).expect("minimal frame should parse");
        assert_eq!(m.id, "1");
        assert!(m.content.is_none());
        assert!(m.embeds.is_empty());
        assert!(m.attachments.is_empty());
    }

    #[test]
    fn embed_fields_round_trip_through_json_columns() {
        let embed = Embed {
            title: Some("Server status".into()),
            color: Some(0x00ff00),
            fields: vec![EmbedField {
                name: "Players".into(),
                value: "12/50".into(),
                inline: true,
            }],
            ..Default::default()
        };
        let json = serde_json::to_string(&vec![embed]).unwrap();
        let back: Vec<Embed> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[0].fields[0].value, "12/50");
    }
}
