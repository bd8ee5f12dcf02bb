//! WebSocket delivery of new messages.
//!
//! Push-only: every frame server→client is one JSON-encoded message.
//! Client frames carry nothing; they are drained so close and ping keep
//! working. Writes happen over the REST send path.

use crate::config::AppState;
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// GET /chat/ws
pub async fn chat_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let mut rx = state.hub.subscribe();
    let (mut sender, mut receiver) = socket.split();
    debug!("[Ws] client connected");

    let mut forward_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(message) => {
                    let json = match serde_json::to_string(&message) {
                        Ok(j) => j,
                        Err(_) => continue,
                    };
                    if sender.send(WsMessage::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("[Ws] client lagging, {} messages skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut drain_task = tokio::spawn(async move {
        while let Some(Ok(frame)) = receiver.next().await {
            if let WsMessage::Close(_) = frame {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut forward_task => drain_task.abort(),
        _ = &mut drain_task => forward_task.abort(),
    }

    debug!("[Ws] client disconnected");
}
