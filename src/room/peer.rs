//! Peer identity and the per-room peer registry.

use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::mpsc;

use crate::message::ServerMessage;

/// One client connection within a room.
///
/// The room actor owns this exclusively; it is never shared outside the
/// actor's own task, so no internal locking is needed.
pub struct Peer {
    pub id: String,
    pub connected_at: Instant,
    pub last_heartbeat_at: Instant,
    /// Non-owning handle used to push frames to this peer's connection
    /// task. The actual socket lives in the connection task, not here.
    outbound: mpsc::Sender<ServerMessage>,
}

impl Peer {
    fn new(id: String, outbound: mpsc::Sender<ServerMessage>, now: Instant) -> Self {
        Self {
            id,
            connected_at: now,
            last_heartbeat_at: now,
            outbound,
        }
    }

    /// Send a frame to this peer. Failures (the connection task has
    /// already exited) are the caller's to log; they never abort a
    /// fan-out to other peers.
    pub fn send(&self, message: ServerMessage) -> Result<(), mpsc::error::TrySendError<ServerMessage>> {
        self.outbound.try_send(message)
    }
}

/// Registry of peers currently registered in one room.
///
/// Capacity-enforced at [`PeerRegistry::register`]; every other mutation
/// assumes the caller already holds a valid peer id.
#[derive(Default)]
pub struct PeerRegistry {
    peers: HashMap<String, Peer>,
    capacity: usize,
}

/// Why [`PeerRegistry::register`] refused to admit a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterError {
    /// Room size is already at capacity.
    RoomFull,
    /// A peer with this id is already registered (invariant: at most one
    /// `Peer` per `(room, id)`).
    AlreadyRegistered,
}

impl PeerRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            peers: HashMap::new(),
            capacity,
        }
    }

    pub fn register(
        &mut self,
        id: String,
        outbound: mpsc::Sender<ServerMessage>,
        now: Instant,
    ) -> Result<(), RegisterError> {
        if self.peers.contains_key(&id) {
            return Err(RegisterError::AlreadyRegistered);
        }
        if self.peers.len() >= self.capacity {
            return Err(RegisterError::RoomFull);
        }
        self.peers.insert(id.clone(), Peer::new(id, outbound, now));
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<Peer> {
        self.peers.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&Peer> {
        self.peers.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.peers.contains_key(id)
    }

    pub fn touch_heartbeat(&mut self, id: &str, now: Instant) {
        if let Some(peer) = self.peers.get_mut(id) {
            peer.last_heartbeat_at = now;
        }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.peers.len() >= self.capacity
    }

    /// All peers except `exclude`, for fan-out.
    pub fn others(&self, exclude: &str) -> impl Iterator<Item = &Peer> {
        self.peers.values().filter(move |p| p.id != exclude)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.peers.keys().map(String::as_str)
    }

    /// Ids of peers whose last heartbeat is older than `timeout` as of `now`.
    pub fn expired(&self, now: Instant, timeout: std::time::Duration) -> Vec<String> {
        self.peers
            .values()
            .filter(|p| now.duration_since(p.last_heartbeat_at) >= timeout)
            .map(|p| p.id.clone())
            .collect()
    }
}
