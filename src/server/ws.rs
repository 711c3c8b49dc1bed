use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt, stream::SplitSink, stream::SplitStream};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, warn};

use pipeline_common::{Deal, DealId, Stage, StageId};

use super::api::SharedState;
use crate::board::{Celebration, Notification, Notifier};

/// How often to send WebSocket Ping frames.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How long to wait for a Pong response before considering the connection dead.
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

// ── WebSocket message types ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    DealCreated {
        deal: Deal,
    },
    DealUpdated {
        deal: Deal,
    },
    DealMoved {
        deal_id: DealId,
        from_stage_id: StageId,
        to_stage_id: StageId,
        stage_changed_at: DateTime<Utc>,
    },
    DealDeleted {
        deal_id: DealId,
    },
    DealWon {
        deal: Deal,
        stage_name: String,
    },
    Notification {
        notification: Notification,
    },
}

// ── WebSocket handler ────────────────────────────────────────────────

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    let rx = state.ws_tx.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, rx))
}

async fn handle_socket(socket: WebSocket, rx: broadcast::Receiver<String>) {
    let (sender, receiver) = socket.split();
    debug!("WebSocket client connected");
    run_socket_loop(sender, receiver, rx).await;
    debug!("WebSocket client disconnected");
}

/// Forward broadcasts to one client with ping/pong keepalive. The loop
/// exits when the client closes, errors or misses a pong for
/// [`PONG_TIMEOUT`].
async fn run_socket_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut rx: broadcast::Receiver<String>,
) {
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    // First tick completes immediately.
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
                        debug!(skipped, "WebSocket client lagging; dropped events");
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

/// Serialize and broadcast a WsMessage to all connected clients. Having no
/// clients connected is not an error.
pub fn broadcast_message(tx: &broadcast::Sender<String>, msg: &WsMessage) {
    match serde_json::to_string(msg) {
        Ok(json) => {
            let _ = tx.send(json);
        }
        Err(e) => {
            warn!(error = %e, "Failed to serialize WsMessage");
        }
    }
}

/// Publishes a `DealWon` event for every closed-won move.
#[derive(Clone)]
pub struct BroadcastCelebration {
    tx: broadcast::Sender<String>,
}

impl BroadcastCelebration {
    pub fn new(tx: broadcast::Sender<String>) -> Self {
        Self { tx }
    }
}

impl Celebration for BroadcastCelebration {
    fn celebrate(&self, deal: &Deal, stage: &Stage) {
        broadcast_message(
            &self.tx,
            &WsMessage::DealWon {
                deal: deal.clone(),
                stage_name: stage.name.clone(),
            },
        );
    }
}

/// Publishes board notifications to connected clients.
#[derive(Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<String>,
}

impl BroadcastNotifier {
    pub fn new(tx: broadcast::Sender<String>) -> Self {
        Self { tx }
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, notification: Notification) {
        broadcast_message(&self.tx, &WsMessage::Notification { notification });
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::test_support::{deal_in, stage};
    use uuid::Uuid;

    #[test]
    fn test_ws_message_deal_moved_serialization() {
        let from = Uuid::new_v4();
        let to = Uuid::new_v4();
        let msg = WsMessage::DealMoved {
            deal_id: Uuid::nil(),
            from_stage_id: from,
            to_stage_id: to,
            stage_changed_at: Utc::now(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"DealMoved\""));
        assert!(json.contains("\"data\""));
        assert!(json.contains(&format!("\"to_stage_id\":\"{}\"", to)));
    }

    #[test]
    fn test_ws_message_deal_deleted_serialization() {
        let msg = WsMessage::DealDeleted {
            deal_id: Uuid::nil(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"DealDeleted\""));
        assert!(json.contains("00000000-0000-0000-0000-000000000000"));
    }

    #[test]
    fn test_broadcast_without_receivers_is_silent() {
        let (tx, _) = broadcast::channel::<String>(4);
        broadcast_message(&tx, &WsMessage::DealDeleted { deal_id: Uuid::nil() });
    }

    #[test]
    fn test_broadcast_celebration_publishes_deal_won() {
        let (tx, mut rx) = broadcast::channel::<String>(4);
        let won = stage("Closed Won", 4, Some(100));
        let deal = deal_in(won.id, "Big one", 90_000);
        BroadcastCelebration::new(tx).celebrate(&deal, &won);

        let json: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(json["type"], "DealWon");
        assert_eq!(json["data"]["stage_name"], "Closed Won");
        assert_eq!(json["data"]["deal"]["name"], "Big one");
    }

    #[test]
    fn test_broadcast_notifier_publishes_notification() {
        let (tx, mut rx) = broadcast::channel::<String>(4);
        BroadcastNotifier::new(tx).notify(Notification::error("Failed to move deal"));

        let json: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(json["type"], "Notification");
        assert_eq!(json["data"]["notification"]["level"], "error");
    }
}
