//! Content relayed between chat partners.

use serde::{Deserialize, Serialize};

/// A message one partner sends to the other.
///
/// The gateway never inspects the payload beyond its kind; transports
/// decide which kinds they can deliver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatMessage {
    Text {
        text: String,
    },
    /// Photo, sticker, voice, etc. identified by a platform file handle.
    Media {
        kind: String,
        file_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Location {
        latitude: f64,
        longitude: f64,
    },
}

impl ChatMessage {
    pub fn text(text: impl Into<String>) -> Self {
        ChatMessage::Text { text: text.into() }
    }

    pub fn kind(&self) -> &str {
        match self {
            ChatMessage::Text { .. } => "text",
            ChatMessage::Media { kind, .. } => kind,
            ChatMessage::Location { .. } => "location",
        }
    }
}
