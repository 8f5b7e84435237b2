//! Per-room state: peer registry, rate limiter, pending queue, router, and
//! the actor task that ties them together.

pub mod actor;
pub mod peer;
pub mod queue;
pub mod rate_limit;
pub mod router;

pub use actor::{peer_outbound_capacity, spawn, RoomCommand};
pub use peer::RegisterError;
