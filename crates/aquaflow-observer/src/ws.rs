//! `WebSocket` handler for real-time frame streaming.
//!
//! Clients connect to `GET /ws/frames` and receive the current frame
//! immediately, then a JSON-encoded [`StreamMessage`] for every frame,
//! sample and log entry the engine publishes.
//!
//! If a client falls behind, lagged messages are silently skipped and
//! the client resumes from the most recent message.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tracing::{debug, warn};

use crate::state::{AppState, StreamMessage};

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming.
///
/// # Route
///
/// `GET /ws/frames`
pub async fn ws_frames(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Encode a stream message as a text frame.
fn encode(message: &StreamMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!("Failed to serialize stream message: {e}");
            None
        }
    }
}

/// Handle the `WebSocket` lifecycle: send the current frame, then forward
/// every broadcast message.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("WebSocket client connected");

    // Subscribe before the snapshot so nothing published in between is lost.
    let mut rx = state.subscribe();
    let initial = StreamMessage::Frame(state.controller.snapshot().await);
    if let Some(msg) = encode(&initial) {
        if socket.send(msg).await.is_err() {
            debug!("WebSocket client disconnected before first frame");
            return;
        }
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(message) => {
                        let Some(msg) = encode(&message) else {
                            continue;
                        };
                        if socket.send(msg).await.is_err() {
                            debug!("WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        debug!(skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        debug!("Broadcast channel closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    // Commands go through the REST endpoints.
                    _ => {}
                }
            }
        }
    }
}
