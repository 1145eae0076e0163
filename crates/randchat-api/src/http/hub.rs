//! WebSocket connection registry acting as the chat transport.
//!
//! Each connected client owns an unbounded outbound queue. A user without a
//! live connection is unreachable, the same way a platform user who blocked
//! the bot would be.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use randchat_core::transport::ChatTransport;
use randchat_types::error::DeliveryError;
use randchat_types::message::ChatMessage;
use randchat_types::user::UserId;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Media kinds a WebSocket client can render.
const SUPPORTED_MEDIA: &[&str] = &["photo", "video", "audio", "voice", "document", "animation"];

/// Frame pushed to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Service notification, already localized.
    Notice { text: String },
    /// Content from the chat partner.
    Message { message: ChatMessage },
}

/// Outbound queue of one live connection.
struct Connection {
    id: u64,
    sender: mpsc::UnboundedSender<ServerFrame>,
}

/// A registered connection: its id and the frames queued for it.
pub struct Registration {
    pub id: u64,
    pub frames: mpsc::UnboundedReceiver<ServerFrame>,
}

#[derive(Default)]
pub struct WsHub {
    connections: DashMap<UserId, Connection>,
    next_id: AtomicU64,
}

impl WsHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `user`, replacing any previous one.
    ///
    /// The replaced connection's queue closes.
    pub fn connect(&self, user: UserId) -> Registration {
        let (sender, frames) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if self.connections.insert(user, Connection { id, sender }).is_some() {
            tracing::debug!(user_id = %user, "replaced existing connection");
        }
        Registration { id, frames }
    }

    /// Forget connection `id` of `user` unless a newer one replaced it.
    pub fn disconnect(&self, user: UserId, id: u64) {
        self.connections.remove_if(&user, |_, current| current.id == id);
    }

    pub fn is_connected(&self, user: UserId) -> bool {
        self.connections.contains_key(&user)
    }

    pub fn connected(&self) -> usize {
        self.connections.len()
    }

    fn push(&self, user: UserId, frame: ServerFrame) -> Result<(), DeliveryError> {
        let Some(connection) = self.connections.get(&user) else {
            return Err(DeliveryError::Unreachable(format!("user {user} is not connected")));
        };
        connection
            .sender
            .send(frame)
            .map_err(|_| DeliveryError::Unreachable(format!("connection of user {user} closed")))
    }
}

impl ChatTransport for WsHub {
    async fn notify(&self, user: UserId, text: &str) -> Result<(), DeliveryError> {
        self.push(
            user,
            ServerFrame::Notice {
                text: text.to_string(),
            },
        )
    }

    async fn relay(&self, user: UserId, message: &ChatMessage) -> Result<(), DeliveryError> {
        if let ChatMessage::Media { kind, .. } = message {
            if !SUPPORTED_MEDIA.contains(&kind.as_str()) {
                return Err(DeliveryError::Unsupported(kind.clone()));
            }
        }
        self.push(
            user,
            ServerFrame::Message {
                message: message.clone(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notify_reaches_connected_user() {
        let hub = WsHub::new();
        let mut registration = hub.connect(UserId(1));

        hub.notify(UserId(1), "hello").await.unwrap();

        assert_eq!(
            registration.frames.recv().await.unwrap(),
            ServerFrame::Notice {
                text: "hello".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_unconnected_user_is_unreachable() {
        let hub = WsHub::new();
        let err = hub.notify(UserId(1), "hello").await.unwrap_err();
        assert!(matches!(err, DeliveryError::Unreachable(_)));

        let registration = hub.connect(UserId(2));
        drop(registration);
        let err = hub.notify(UserId(2), "hello").await.unwrap_err();
        assert!(matches!(err, DeliveryError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_relay_rejects_unsupported_media() {
        let hub = WsHub::new();
        let _registration = hub.connect(UserId(1));
        let sticker = ChatMessage::Media {
            kind: "sticker".to_string(),
            file_id: "abc".to_string(),
            caption: None,
        };

        let err = hub.relay(UserId(1), &sticker).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Unsupported(ref kind) if kind == "sticker"));

        hub.relay(UserId(1), &ChatMessage::text("hi")).await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_disconnect_keeps_new_connection() {
        let hub = WsHub::new();
        let mut old = hub.connect(UserId(1));
        let new = hub.connect(UserId(1));

        // The replaced queue is closed.
        assert!(old.frames.recv().await.is_none());

        hub.disconnect(UserId(1), old.id);
        assert!(hub.is_connected(UserId(1)));

        hub.disconnect(UserId(1), new.id);
        assert_eq!(hub.connected(), 0);
    }

    #[test]
    fn test_frame_wire_shape() {
        let frame = ServerFrame::Message {
            message: ChatMessage::text("hi"),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "message", "message": {"type": "text", "text": "hi"}})
        );
    }
}
