use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Extension, Router,
};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::state::AppState;

/// Message delivered to a connected receiver. The sender id comes from
/// the verified token of the sending connection, never from the frame.
#[derive(Debug, Clone, Serialize)]
pub struct ChatEvent {
    pub sender_id: Uuid,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct InboundMessage {
    receiver_id: Uuid,
    content: String,
}

/// Process-wide registry of connected chat users. Sockets are inserted
/// on connect and removed on disconnect; delivery to an absent user is
/// dropped, not queued.
#[derive(Clone, Default)]
pub struct ChatRegistry {
    connections: Arc<RwLock<HashMap<Uuid, mpsc::UnboundedSender<ChatEvent>>>>,
}

impl ChatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self, user_id: Uuid) -> mpsc::UnboundedReceiver<ChatEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections
            .write()
            .expect("chat registry poisoned")
            .insert(user_id, tx);
        rx
    }

    pub fn disconnect(&self, user_id: Uuid) {
        self.connections
            .write()
            .expect("chat registry poisoned")
            .remove(&user_id);
    }

    /// Returns whether the receiver was connected and the message was
    /// handed to their socket task.
    pub fn deliver(&self, receiver_id: Uuid, event: ChatEvent) -> bool {
        match self
            .connections
            .read()
            .expect("chat registry poisoned")
            .get(&receiver_id)
        {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    pub fn online_count(&self) -> usize {
        self.connections.read().expect("chat registry poisoned").len()
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/chat/ws", get(ws_upgrade))
}

async fn ws_upgrade(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| relay(socket, state.chat.clone(), user.id))
}

async fn relay(socket: WebSocket, registry: ChatRegistry, user_id: Uuid) {
    let mut rx = registry.connect(user_id);
    debug!(%user_id, online = registry.online_count(), "chat connected");

    let (mut sink, mut stream) = socket.split();

    // Pump queued events out to this user's socket.
    let mut forward = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(_) => continue,
            };
            if sink.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let inbound: InboundMessage = match serde_json::from_str(text.as_str()) {
                            Ok(inbound) => inbound,
                            Err(err) => {
                                warn!(%user_id, %err, "dropping malformed chat frame");
                                continue;
                            }
                        };
                        if inbound.receiver_id == user_id {
                            continue;
                        }
                        let delivered = registry.deliver(
                            inbound.receiver_id,
                            ChatEvent {
                                sender_id: user_id,
                                content: inbound.content,
                                sent_at: Utc::now(),
                            },
                        );
                        if !delivered {
                            debug!(receiver_id = %inbound.receiver_id, "receiver offline, message dropped");
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // ping/pong handled by axum
                    Some(Err(_)) => break,
                }
            }
            _ = &mut forward => break,
        }
    }

    registry.disconnect(user_id);
    forward.abort();
    debug!(%user_id, "chat disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(sender_id: Uuid, content: &str) -> ChatEvent {
        ChatEvent {
            sender_id,
            content: content.to_string(),
            sent_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn delivers_to_connected_user_in_order() {
        let registry = ChatRegistry::new();
        let receiver = Uuid::new_v4();
        let sender = Uuid::new_v4();
        let mut rx = registry.connect(receiver);

        assert!(registry.deliver(receiver, event(sender, "first")));
        assert!(registry.deliver(receiver, event(sender, "second")));

        assert_eq!(rx.recv().await.unwrap().content, "first");
        assert_eq!(rx.recv().await.unwrap().content, "second");
    }

    #[tokio::test]
    async fn delivery_to_offline_user_is_dropped() {
        let registry = ChatRegistry::new();
        assert!(!registry.deliver(Uuid::new_v4(), event(Uuid::new_v4(), "hello")));
    }

    #[tokio::test]
    async fn disconnect_removes_registration() {
        let registry = ChatRegistry::new();
        let user = Uuid::new_v4();
        let _rx = registry.connect(user);
        assert_eq!(registry.online_count(), 1);

        registry.disconnect(user);
        assert_eq!(registry.online_count(), 0);
        assert!(!registry.deliver(user, event(Uuid::new_v4(), "late")));
    }
}
