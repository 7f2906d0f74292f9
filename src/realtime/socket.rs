// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Websocket connection handling.
//!
//! Each connection authenticates during the handshake (token query
//! parameter, same JWT as the REST surface), then acts as a relay: the
//! client joins rooms and emits events, the hub fans them out to every
//! other session in the room. The connection also owns the user's
//! presence session, so closing the socket is what drives the
//! best-effort offline write.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use super::events::{ClientEvent, Envelope, ServerEvent};
use super::hub::{conversation_room, user_room};
use crate::error::AppError;
use crate::middleware::auth::decode_token;
use crate::services::presence::{PresenceSession, PresenceSignal};
use crate::AppState;

/// Outbound queue length per connection.
const OUTBOUND_BUFFER: usize = 64;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    token: String,
}

/// `GET /ws?token=...` upgrade handler.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let claims = decode_token(&params.token, &state.config.jwt_secret)?;
    Ok(ws.on_upgrade(move |socket| handle_socket(state, claims.sub, socket)))
}

async fn handle_socket(state: Arc<AppState>, uid: String, socket: WebSocket) {
    let session_id = state.rooms.next_session_id();
    tracing::info!(%uid, session = session_id, "Realtime session connected");

    let presence = PresenceSession::start(state.db.clone(), uid.clone(), state.presence);

    let (mut sink, mut stream) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ServerEvent>(OUTBOUND_BUFFER);

    let writer = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    tracing::error!(%err, "Failed to encode realtime event");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut session = Session {
        state: Arc::clone(&state),
        uid,
        session_id,
        out_tx,
        joined: HashMap::new(),
        presence,
    };

    while let Some(result) = stream.next().await {
        let message = match result {
            Ok(message) => message,
            Err(_) => break,
        };
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(text.as_str()) {
                Ok(event) => session.handle_event(event).await,
                Err(err) => {
                    tracing::debug!(uid = %session.uid, %err, "Ignoring malformed realtime event");
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    session.shutdown().await;
    writer.abort();
    tracing::info!(session = session_id, "Realtime session closed");
}

struct Session {
    state: Arc<AppState>,
    uid: String,
    session_id: u64,
    out_tx: mpsc::Sender<ServerEvent>,
    /// Forwarder task per joined room
    joined: HashMap<String, JoinHandle<()>>,
    presence: PresenceSession,
}

impl Session {
    async fn handle_event(&mut self, event: ClientEvent) {
        // Visibility reports are not user activity; everything else is.
        match &event {
            ClientEvent::VisibilityChange { .. } => {}
            _ => self.presence.signal(PresenceSignal::Activity),
        }

        match event {
            ClientEvent::JoinUserRoom { user_id } => {
                if user_id != self.uid {
                    tracing::warn!(
                        uid = %self.uid,
                        requested = %user_id,
                        "Refusing to join another user's room"
                    );
                    return;
                }
                self.join(user_room(&user_id));
            }
            ClientEvent::JoinConversation { conversation_id } => {
                self.join(conversation_room(&conversation_id));
            }
            ClientEvent::LeaveConversation { conversation_id } => {
                self.leave(&conversation_room(&conversation_id)).await;
            }
            ClientEvent::SendMessage {
                conversation_id,
                message,
                recipient_id,
                sender,
            } => {
                self.publish(
                    &conversation_room(&conversation_id),
                    ServerEvent::NewMessage {
                        message: message.clone(),
                    },
                );
                if let Some(recipient_id) = recipient_id {
                    self.publish(
                        &user_room(&recipient_id),
                        ServerEvent::MessageNotification {
                            conversation_id,
                            message,
                            sender,
                        },
                    );
                }
            }
            ClientEvent::TypingStart {
                conversation_id,
                user_id,
                user_name,
            } => {
                self.publish(
                    &conversation_room(&conversation_id),
                    ServerEvent::UserTyping { user_id, user_name },
                );
            }
            ClientEvent::TypingStop {
                conversation_id,
                user_id,
            } => {
                self.publish(
                    &conversation_room(&conversation_id),
                    ServerEvent::UserStoppedTyping { user_id },
                );
            }
            ClientEvent::MessageRead {
                conversation_id,
                user_id,
                message_ids,
            } => {
                self.publish(
                    &conversation_room(&conversation_id),
                    ServerEvent::MessagesRead {
                        user_id,
                        message_ids,
                    },
                );
            }
            ClientEvent::VisibilityChange { hidden } => {
                self.presence.signal(if hidden {
                    PresenceSignal::Hidden
                } else {
                    PresenceSignal::Visible
                });
            }
            // Already counted as activity above.
            ClientEvent::Activity => {}
        }
    }

    fn join(&mut self, room: String) {
        if self.joined.contains_key(&room) {
            return;
        }
        let receiver = self.state.rooms.subscribe(&room);
        tracing::debug!(uid = %self.uid, room, "Joined room");
        let task = spawn_forwarder(receiver, self.session_id, self.out_tx.clone(), room.clone());
        self.joined.insert(room, task);
    }

    async fn leave(&mut self, room: &str) {
        if let Some(task) = self.joined.remove(room) {
            task.abort();
            let _ = task.await;
            self.state.rooms.forget_if_empty(room);
            tracing::debug!(uid = %self.uid, room, "Left room");
        }
    }

    fn publish(&self, room: &str, event: ServerEvent) {
        self.state.rooms.publish(
            room,
            Envelope {
                origin: self.session_id,
                event,
            },
        );
    }

    async fn shutdown(mut self) {
        let rooms: Vec<String> = self.joined.keys().cloned().collect();
        for room in rooms {
            self.leave(&room).await;
        }
        self.presence.stop().await;
    }
}

/// Forward room traffic to this session's outbound queue, skipping
/// envelopes it published itself.
fn spawn_forwarder(
    mut receiver: broadcast::Receiver<Envelope>,
    session_id: u64,
    out_tx: mpsc::Sender<ServerEvent>,
    room: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(envelope) => {
                    if envelope.origin == session_id {
                        continue;
                    }
                    if out_tx.send(envelope.event).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(room, skipped, "Realtime subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
