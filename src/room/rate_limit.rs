//! Per-peer fixed sliding-window rate limiting.
//!
//! A simple fixed window: bursts up to `2x max` at window boundaries are
//! acceptable for this protocol's traffic profile.

use std::collections::HashMap;
use std::time::{Duration, Instant};

struct Window {
    start: Instant,
    count: u32,
}

pub struct RateLimiter {
    windows: HashMap<String, Window>,
    max_messages: u32,
    window_duration: Duration,
}

impl RateLimiter {
    pub fn new(max_messages: u32, window_duration: Duration) -> Self {
        Self {
            windows: HashMap::new(),
            max_messages,
            window_duration,
        }
    }

    /// Admit or reject a message from `peer_id` at time `now`.
    pub fn admit(&mut self, peer_id: &str, now: Instant) -> bool {
        match self.windows.get_mut(peer_id) {
            None => {
                self.windows.insert(
                    peer_id.to_string(),
                    Window { start: now, count: 1 },
                );
                true
            }
            Some(window) => {
                if now.duration_since(window.start) >= self.window_duration {
                    window.start = now;
                    window.count = 1;
                    true
                } else if window.count < self.max_messages {
                    window.count += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Clear rate-limit state for a peer. Called on peer removal so the
    /// limiter holds no entries for peers no longer registered.
    pub fn reset(&mut self, peer_id: &str) {
        self.windows.remove(peer_id);
    }

    /// Remaining admits in the current window, for observability. Does
    /// not mutate state.
    pub fn remaining(&self, peer_id: &str, now: Instant) -> u32 {
        match self.windows.get(peer_id) {
            None => self.max_messages,
            Some(window) if now.duration_since(window.start) >= self.window_duration => {
                self.max_messages
            }
            Some(window) => self.max_messages.saturating_sub(window.count),
        }
    }
}
