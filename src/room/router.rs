//! Stateless translation from an inbound client frame to the server frame
//! its destination peer receives.
//!
//! `HEARTBEAT` and `LEAVE` are handled directly by the room actor and never
//! reach this table; everything else is a src-addressed relay where only
//! the envelope changes, not the payload.

use crate::message::{ClientMessage, ServerMessage};

/// The outcome of routing one client message: who should receive it, and
/// what frame they should receive.
pub struct Routed {
    pub dst: String,
    pub frame: ServerMessage,
}

/// Translate a relayable client message into the frame its destination
/// receives. Returns `None` for `Heartbeat`/`Leave`, which carry no `dst`
/// and are handled by the room actor directly.
pub fn route(src: &str, message: ClientMessage) -> Option<Routed> {
    match message {
        ClientMessage::Offer { dst, payload, .. } => Some(Routed {
            dst,
            frame: ServerMessage::Offer {
                src: src.to_string(),
                payload,
            },
        }),
        ClientMessage::Answer { dst, payload, .. } => Some(Routed {
            dst,
            frame: ServerMessage::Answer {
                src: src.to_string(),
                payload,
            },
        }),
        ClientMessage::Candidate { dst, payload, .. } => Some(Routed {
            dst,
            frame: ServerMessage::Candidate {
                src: src.to_string(),
                payload,
            },
        }),
        ClientMessage::Heartbeat | ClientMessage::Leave { .. } => None,
    }
}
