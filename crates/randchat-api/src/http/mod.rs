//! HTTP and WebSocket surface for randchat.
//!
//! Axum routes under `/api/v1/` with an envelope response format. Chat
//! clients connect over `/api/v1/ws`; the [`hub::WsHub`] is the transport the
//! core delivers through.

pub mod error;
pub mod handlers;
pub mod hub;
pub mod response;
pub mod router;
