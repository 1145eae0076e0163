//! Chat transport port.
//!
//! The transport is whatever carries text to and from users: a messaging
//! platform adapter in production, a WebSocket hub in `randchat serve`, an
//! in-memory recorder in tests.

use randchat_types::error::DeliveryError;
use randchat_types::message::ChatMessage;
use randchat_types::user::UserId;

/// Outbound delivery to a single user.
///
/// `DeliveryError::Unreachable` means the user blocked the bot or cannot be
/// reached at all; callers treat it differently from other transport errors.
pub trait ChatTransport: Send + Sync {
    /// Send a service notification (already localized).
    fn notify(
        &self,
        user: UserId,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), DeliveryError>> + Send;

    /// Forward a partner's message verbatim.
    fn relay(
        &self,
        user: UserId,
        message: &ChatMessage,
    ) -> impl std::future::Future<Output = Result<(), DeliveryError>> + Send;
}
