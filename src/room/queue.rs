//! Pending message queue.
//!
//! Holds messages addressed to a peer that has not registered yet, so a
//! caller that races ahead of its callee's connection still gets delivered
//! to once the callee shows up. Entries expire after a configurable TTL and
//! each destination key is capped to bound memory under a dead or malicious
//! destination.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::message::ServerMessage;

struct Entry {
    message: ServerMessage,
    queued_at: Instant,
}

#[derive(Default)]
pub struct PendingQueue {
    entries: HashMap<String, Vec<Entry>>,
    ttl: Duration,
    max_per_key: usize,
}

impl PendingQueue {
    pub fn new(ttl: Duration, max_per_key: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            max_per_key,
        }
    }

    /// Queue `message` for `dst`. Expired entries are evicted first; if the
    /// destination's queue is still at capacity afterward, the message is
    /// rejected (returns `false`) rather than displacing an older one.
    #[must_use]
    pub fn push(&mut self, dst: &str, message: ServerMessage, now: Instant) -> bool {
        let entries = self.entries.entry(dst.to_string()).or_default();
        entries.retain(|e| now.duration_since(e.queued_at) < self.ttl);
        if entries.len() >= self.max_per_key {
            return false;
        }
        entries.push(Entry {
            message,
            queued_at: now,
        });
        true
    }

    /// Remove and return all non-expired messages queued for `dst`, oldest
    /// first. Leaves no residual entry for `dst` behind.
    pub fn drain(&mut self, dst: &str, now: Instant) -> Vec<ServerMessage> {
        let Some(entries) = self.entries.remove(dst) else {
            return Vec::new();
        };
        entries
            .into_iter()
            .filter(|e| now.duration_since(e.queued_at) < self.ttl)
            .map(|e| e.message)
            .collect()
    }

    /// Drop expired entries across all destinations. Keys left empty after
    /// sweeping are removed entirely.
    pub fn sweep(&mut self, now: Instant) {
        self.entries.retain(|_, entries| {
            entries.retain(|e| now.duration_since(e.queued_at) < self.ttl);
            !entries.is_empty()
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
