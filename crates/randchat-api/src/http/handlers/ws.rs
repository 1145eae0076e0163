//! WebSocket chat endpoint.
//!
//! `GET /api/v1/ws?user_id=<id>` upgrades to a WebSocket bound to one user.
//! Inbound text frames are JSON [`ChatMessage`]s and go to the session
//! gateway; outbound frames are [`ServerFrame`]s queued by the hub.
//!
//! Closing the socket does not end the user's chat. Until they reconnect,
//! deliveries to them fail as unreachable and their partner is told so on
//! the next message.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use randchat_types::message::ChatMessage;
use randchat_types::user::UserId;
use serde::Deserialize;

use crate::http::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub user_id: i64,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = UserId(params.user_id);
    // Register (and persist) the user before the upgrade so a bad id fails
    // with a regular HTTP error.
    state.lifecycle().directory().get_or_create(user_id).await?;
    Ok(ws.on_upgrade(move |socket| handle_ws_connection(socket, state, user_id)))
}

async fn handle_ws_connection(socket: WebSocket, state: AppState, user_id: UserId) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let mut registration = state.hub.connect(user_id);
    tracing::info!(user_id = %user_id, "client connected");

    loop {
        tokio::select! {
            frame = registration.frames.recv() => {
                let Some(frame) = frame else {
                    // Replaced by a newer connection.
                    break;
                };
                match serde_json::to_string(&frame) {
                    Ok(json) => {
                        if ws_sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => tracing::warn!(user_id = %user_id, "Failed to serialize frame: {err}"),
                }
            }

            msg_result = ws_receiver.next() => {
                match msg_result {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(&state, user_id, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(user_id = %user_id, "WebSocket receive error: {err}");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.hub.disconnect(user_id, registration.id);
    tracing::info!(user_id = %user_id, "client disconnected");
}

async fn handle_frame(state: &AppState, user_id: UserId, text: &str) {
    let message: ChatMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(err) => {
            tracing::warn!(user_id = %user_id, error = %err, "Ignoring malformed frame");
            return;
        }
    };

    // The gateway reports failures to the user and logs them itself.
    if let Err(e) = state.gateway.handle(user_id, &message).await {
        tracing::debug!(user_id = %user_id, error = %e, "message handling failed");
    }
}
