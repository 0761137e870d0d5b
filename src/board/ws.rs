use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink, stream::SplitStream};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, warn};

use taskboard_common::BoardId;

use super::gateway::Change;

/// How often to send WebSocket Ping frames.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How long to wait for a Pong response before considering the connection dead.
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

// ── WebSocket message types ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    /// A record was inserted, patched or removed in the store.
    RecordChanged { change: Change },
    /// A server-side drag finished writing.
    DragSettled {
        board_id: BoardId,
        item_id: String,
        applied: usize,
        failed: usize,
    },
}

// ── WebSocket handler ────────────────────────────────────────────────

/// WebSocket upgrade handler. Each client gets its own broadcast receiver.
pub async fn ws_handler_with_sender(
    ws: WebSocketUpgrade,
    tx: broadcast::Sender<String>,
) -> impl IntoResponse {
    let rx = tx.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, rx))
}

async fn handle_socket(socket: WebSocket, rx: broadcast::Receiver<String>) {
    let (sender, receiver) = socket.split();
    debug!("WebSocket client connected");
    run_socket_loop(sender, receiver, rx).await;
    debug!("WebSocket client disconnected");
}

/// Core WebSocket loop with ping/pong keepalive.
///
/// Forwards broadcast messages, watches client frames, and pings every
/// [`PING_INTERVAL`]. A connection that has not answered within
/// [`PONG_TIMEOUT`] is dropped.
async fn run_socket_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut rx: broadcast::Receiver<String>,
) {
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    // The first tick completes immediately.
    ping_interval.tick().await;

    let mut last_pong = Instant::now();
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if awaiting_pong && last_pong.elapsed() > PONG_TIMEOUT {
                    break;
                }
                if sender.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
                awaiting_pong = true;
            }

            result = rx.recv() => {
                match result {
                    Ok(msg) => {
                        if sender.send(Message::Text(msg.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "WebSocket client lagged behind the change feed");
                        continue;
                    }
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                        awaiting_pong = false;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    let _ = sender.send(Message::Close(None)).await;
}

// ── Broadcast helpers ────────────────────────────────────────────────

/// Serialize and broadcast a WsMessage to all connected WebSocket clients.
/// Returns silently even if no clients are connected.
pub fn broadcast_message(tx: &broadcast::Sender<String>, msg: &WsMessage) {
    match serde_json::to_string(msg) {
        Ok(json) => {
            let _ = tx.send(json);
        }
        Err(e) => warn!(error = %e, "Failed to serialize WsMessage"),
    }
}

/// Relay store changes onto the socket broadcast until the store goes away.
pub async fn forward_changes(
    mut changes: broadcast::Receiver<Change>,
    tx: broadcast::Sender<String>,
) {
    loop {
        match changes.recv().await {
            Ok(change) => broadcast_message(&tx, &WsMessage::RecordChanged { change }),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Change relay lagged behind the store");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
