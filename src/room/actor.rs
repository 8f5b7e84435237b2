//! The room actor: one `tokio` task per room, a serialized mailbox loop
//! that owns the peer registry, rate limiter, and pending queue outright.
//!
//! No field here is ever shared outside this task, so none of it needs a
//! lock. Concurrency across rooms comes from running many of these tasks
//! side by side on the Tokio runtime, not from shared state within one.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::message::{ClientMessage, ErrorKind, ServerMessage};

use super::peer::{PeerRegistry, RegisterError};
use super::queue::PendingQueue;
use super::rate_limit::RateLimiter;
use super::router;

/// Mailbox size for a room actor. Generous relative to `MaxPeers` since a
/// burst of `HEARTBEAT`s from every peer should never apply backpressure.
const MAILBOX_CAPACITY: usize = 256;

/// Outbound channel capacity for one peer's connection task.
const PEER_OUTBOUND_CAPACITY: usize = 64;

pub enum RoomCommand {
    /// Admit a new peer, replying with the outcome before the caller
    /// upgrades the HTTP connection to a WebSocket.
    Register {
        id: String,
        outbound: mpsc::Sender<ServerMessage>,
        reply: oneshot::Sender<Result<(), RegisterError>>,
    },
    /// A parsed frame received from an already-registered peer.
    Inbound {
        peer_id: String,
        message: ClientMessage,
    },
    /// The peer's connection task has exited; clean up room state.
    Disconnect { peer_id: String },
}

/// Spawn a room actor task and return the sender half of its mailbox.
pub fn spawn(token: String, config: Arc<Config>) -> mpsc::Sender<RoomCommand> {
    let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
    let actor = RoomActor::new(token, config);
    tokio::spawn(actor.run(rx));
    tx
}

struct RoomActor {
    token: String,
    peers: PeerRegistry,
    rate_limiter: RateLimiter,
    pending: PendingQueue,
    config: Arc<Config>,
}

impl RoomActor {
    fn new(token: String, config: Arc<Config>) -> Self {
        Self {
            peers: PeerRegistry::new(config.max_peers_per_room),
            rate_limiter: RateLimiter::new(config.rate_limit_max, config.rate_limit_window),
            pending: PendingQueue::new(config.queue_ttl, config.queue_max_per_peer),
            token,
            config,
        }
    }

    async fn run(mut self, mut mailbox: mpsc::Receiver<RoomCommand>) {
        info!(room = %self.token, "room actor started");
        while let Some(command) = mailbox.recv().await {
            self.handle(command);
            self.sweep_expired();
        }
        info!(room = %self.token, "room actor exiting, no peers and no senders left");
    }

    fn handle(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Register { id, outbound, reply } => self.handle_register(id, outbound, reply),
            RoomCommand::Inbound { peer_id, message } => self.handle_inbound(peer_id, message),
            RoomCommand::Disconnect { peer_id } => self.handle_disconnect(&peer_id),
        }
    }

    fn handle_register(
        &mut self,
        id: String,
        outbound: mpsc::Sender<ServerMessage>,
        reply: oneshot::Sender<Result<(), RegisterError>>,
    ) {
        let now = Instant::now();
        let outcome = self.peers.register(id.clone(), outbound, now);
        if let Err(err) = outcome {
            debug!(room = %self.token, peer_id = %id, ?err, "registration refused");
            let _ = reply.send(Err(err));
            return;
        }

        // OPEN must be the first frame this peer ever sees; pending
        // deliveries land on the same mpsc channel right after it, so
        // ordering falls out of queue order rather than an explicit delay.
        if let Some(peer) = self.peers.get(&id) {
            let _ = peer.send(ServerMessage::Open {
                peer_id: id.clone(),
            });
        }
        for message in self.pending.drain(&id, now) {
            if let Some(peer) = self.peers.get(&id) {
                let _ = peer.send(message);
            }
        }

        info!(room = %self.token, peer_id = %id, peers = self.peers.len(), "peer registered");
        let _ = reply.send(Ok(()));
    }

    fn handle_inbound(&mut self, peer_id: String, message: ClientMessage) {
        if !self.peers.contains(&peer_id) {
            warn!(room = %self.token, peer_id = %peer_id, "inbound frame from unregistered peer, dropping");
            return;
        }

        let now = Instant::now();

        // Liveness is always updated, even if this frame then gets
        // rate-limited: a flood of HEARTBEATs shouldn't leave the peer
        // looking stale to the sweep just because it's also over budget.
        if matches!(message, ClientMessage::Heartbeat) {
            self.peers.touch_heartbeat(&peer_id, now);
        }

        if !self.rate_limiter.admit(&peer_id, now) {
            self.send_error(
                &peer_id,
                ErrorKind::RateLimitExceeded,
                &format!(
                    "Rate limit exceeded ({} messages/second)",
                    self.config.rate_limit_max
                ),
            );
            return;
        }

        match message {
            ClientMessage::Heartbeat => {}
            ClientMessage::Leave { .. } => self.handle_disconnect(&peer_id),
            other => self.handle_relay(peer_id, other, now),
        }
    }

    /// Relay an `OFFER`/`ANSWER`/`CANDIDATE` to its destination, or queue
    /// it if the destination hasn't registered yet.
    fn handle_relay(&mut self, peer_id: String, message: ClientMessage, now: Instant) {
        let Some(src) = message.src() else {
            return;
        };
        if src != peer_id {
            // A peer may only ever claim its own connection's id as `src`.
            self.send_error(
                &peer_id,
                ErrorKind::InvalidMessage,
                "Message src does not match peer ID",
            );
            return;
        }

        let Some(routed) = router::route(&peer_id, message) else {
            return;
        };

        if self.peers.contains(&routed.dst) {
            if let Some(dst_peer) = self.peers.get(&routed.dst) {
                if dst_peer.send(routed.frame).is_err() {
                    warn!(room = %self.token, dst = %routed.dst, "dst connection task gone, dropping frame");
                }
            }
        } else if !self.pending.push(&routed.dst, routed.frame, now) {
            self.send_error(
                &peer_id,
                ErrorKind::UnknownPeer,
                &format!("Destination peer not found: {}", routed.dst),
            );
        }
    }

    fn handle_disconnect(&mut self, peer_id: &str) {
        if self.peers.remove(peer_id).is_none() {
            return;
        }
        self.rate_limiter.reset(peer_id);
        info!(room = %self.token, peer_id = %peer_id, peers = self.peers.len(), "peer left");

        let leave = ServerMessage::Leave {
            peer_id: peer_id.to_string(),
        };
        for other in self.peers.others(peer_id) {
            let _ = other.send(leave.clone());
        }
    }

    /// Evict peers whose heartbeat has gone stale, notifying the rest of
    /// the room. Runs after every mailbox event rather than on a
    /// background timer, so a quiet room only pays this cost when it next
    /// wakes up.
    fn sweep_expired(&mut self) {
        let now = Instant::now();
        let expired = self.peers.expired(now, self.config.heartbeat_timeout);
        for peer_id in expired {
            if let Some(peer) = self.peers.get(&peer_id) {
                let _ = peer.send(ServerMessage::Expire {
                    peer_id: peer_id.clone(),
                });
            }
            self.handle_disconnect(&peer_id);
        }
    }

    fn send_error(&self, peer_id: &str, kind: ErrorKind, message: &str) {
        if let Some(peer) = self.peers.get(peer_id) {
            let _ = peer.send(ServerMessage::error(kind, message));
        }
    }
}

/// Outbound mailbox capacity handed to new peer connection tasks.
pub const fn peer_outbound_capacity() -> usize {
    PEER_OUTBOUND_CAPACITY
}
