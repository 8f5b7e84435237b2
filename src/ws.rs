//! WebSocket upgrade handler for the PeerJS-compatible signaling endpoint.
//!
//! Splits each accepted connection into a reader task (this function) and
//! a writer task, joined only by the peer's outbound `mpsc` channel — the
//! same channel the room actor holds a clone of to push frames to this
//! peer. No socket handle is ever shared with the room actor itself.

use std::sync::atomic::Ordering;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::dispatcher::AppState;
use crate::error::BrokerError;
use crate::message::{self, ErrorKind, ServerMessage};
use crate::room::{self, RegisterError, RoomCommand};

#[derive(Debug, Deserialize)]
pub struct UpgradeQuery {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub token: String,
}

pub async fn handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<UpgradeQuery>,
) -> Response {
    if query.key.is_empty() {
        return BrokerError::MissingParam("key").into_response();
    }
    if query.id.is_empty() {
        return BrokerError::MissingParam("id").into_response();
    }
    if query.token.is_empty() {
        return BrokerError::MissingParam("token").into_response();
    }
    if !message::is_valid_peer_id(&query.id) {
        return BrokerError::InvalidPeerId.into_response();
    }

    let mailbox = state.room_mailbox(&query.token);
    let (outbound_tx, outbound_rx) = mpsc::channel(room::peer_outbound_capacity());
    let (reply_tx, reply_rx) = oneshot::channel();

    let register = RoomCommand::Register {
        id: query.id.clone(),
        outbound: outbound_tx.clone(),
        reply: reply_tx,
    };
    if mailbox.send(register).await.is_err() {
        warn!(room = %query.token, "room actor mailbox closed before registration");
        state.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
        return BrokerError::RegistrationFailed.into_response();
    }

    match reply_rx.await {
        Ok(Ok(())) => {}
        Ok(Err(RegisterError::RoomFull)) => return BrokerError::RoomFull.into_response(),
        Ok(Err(RegisterError::AlreadyRegistered)) => {
            return BrokerError::RegistrationFailed.into_response()
        }
        Err(_) => {
            state.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
            return BrokerError::RegistrationFailed.into_response();
        }
    }

    state.metrics.peers_registered.fetch_add(1, Ordering::Relaxed);

    let peer_id = query.id;
    let token = query.token;
    let max_frame_bytes = state.config.max_frame_bytes;

    ws.on_upgrade(move |socket| {
        handle_socket(
            socket,
            mailbox,
            outbound_tx,
            outbound_rx,
            peer_id,
            token,
            max_frame_bytes,
        )
    })
}

async fn handle_socket(
    socket: WebSocket,
    mailbox: mpsc::Sender<RoomCommand>,
    outbound_tx: mpsc::Sender<ServerMessage>,
    mut outbound_rx: mpsc::Receiver<ServerMessage>,
    peer_id: String,
    token: String,
    max_frame_bytes: usize,
) {
    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if sink.send(Message::Text(frame.to_json().into())).await.is_err() {
                break;
            }
        }
    });

    info!(room = %token, peer_id = %peer_id, "connection open");

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                if text.len() >= max_frame_bytes {
                    send_local_error(
                        &outbound_tx,
                        ErrorKind::InvalidMessage,
                        "Message size exceeds 1MB limit",
                    );
                    continue;
                }
                handle_text_frame(&mailbox, &outbound_tx, &peer_id, &text).await;
            }
            Ok(Message::Close(_)) => {
                debug!(room = %token, peer_id = %peer_id, "client closed connection");
                break;
            }
            Ok(_) => {
                // Binary/ping/pong frames carry no signaling payload; ignored.
            }
            Err(err) => {
                warn!(room = %token, peer_id = %peer_id, %err, "connection error");
                break;
            }
        }
    }

    writer.abort();
    let _ = mailbox
        .send(RoomCommand::Disconnect {
            peer_id: peer_id.clone(),
        })
        .await;
    info!(room = %token, peer_id = %peer_id, "connection closed");
}

async fn handle_text_frame(
    mailbox: &mpsc::Sender<RoomCommand>,
    outbound_tx: &mpsc::Sender<ServerMessage>,
    peer_id: &str,
    text: &str,
) {
    match message::parse_client_message(text) {
        Ok(parsed) => {
            let _ = mailbox
                .send(RoomCommand::Inbound {
                    peer_id: peer_id.to_string(),
                    message: parsed,
                })
                .await;
        }
        Err(err) => {
            send_local_error(outbound_tx, ErrorKind::InvalidMessage, &err.wire_message());
        }
    }
}

fn send_local_error(outbound_tx: &mpsc::Sender<ServerMessage>, kind: ErrorKind, message: &str) {
    let _ = outbound_tx.try_send(ServerMessage::error(kind, message));
}
