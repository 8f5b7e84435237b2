//! PeerJS-compatible WebRTC signaling broker.
//!
//! A dispatcher routes upgrade requests to per-token room actors; each
//! room actor owns its peer registry, rate limiter, and pending message
//! queue outright and runs as a single serialized `tokio` task.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod room;
pub mod ws;
