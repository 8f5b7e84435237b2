//! Wire message schema for the signaling protocol.
//!
//! Client/server shapes mirror the PeerJS signaling handshake: `OFFER`,
//! `ANSWER`, and `CANDIDATE` carry opaque SDP/ICE payloads that this broker
//! never interprets, only validates the envelope around.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Maximum peer id length, per the upgrade-time id format.
pub const MAX_PEER_ID_LEN: usize = 64;

/// `^[A-Za-z0-9-]{1,64}$`
pub fn peer_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9-]{1,64}$").expect("static regex is valid"))
}

/// True if `id` is a syntactically valid peer id.
pub fn is_valid_peer_id(id: &str) -> bool {
    id.len() <= MAX_PEER_ID_LEN && peer_id_regex().is_match(id)
}

/// SDP offer/answer payload. Forwarded verbatim; `sdp` is never parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdpPayload {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

/// ICE candidate payload. Forwarded verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcePayload {
    pub candidate: String,
    #[serde(rename = "sdpMid", default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(
        rename = "sdpMLineIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_m_line_index: Option<u32>,
    #[serde(
        rename = "usernameFragment",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub username_fragment: Option<String>,
}

/// A signaling payload forwarded between peers without interpretation.
///
/// `OFFER`/`ANSWER` carry [`SdpPayload`], `CANDIDATE` carries [`IcePayload`].
/// Kept untyped-by-message-kind at this layer (the kind is determined by the
/// enclosing [`ClientMessage`]/[`ServerMessage`] variant) and re-serialized
/// verbatim on the wire.
pub type RawPayload = serde_json::Value;

/// Messages a client may send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "HEARTBEAT")]
    Heartbeat,
    #[serde(rename = "OFFER")]
    Offer {
        src: String,
        dst: String,
        payload: RawPayload,
    },
    #[serde(rename = "ANSWER")]
    Answer {
        src: String,
        dst: String,
        payload: RawPayload,
    },
    #[serde(rename = "CANDIDATE")]
    Candidate {
        src: String,
        dst: String,
        payload: RawPayload,
    },
    #[serde(rename = "LEAVE")]
    Leave { src: String },
}

impl ClientMessage {
    /// The `src` field carried by this message, if any.
    ///
    /// `HEARTBEAT` carries no `src`; every other client message does.
    pub fn src(&self) -> Option<&str> {
        match self {
            Self::Heartbeat => None,
            Self::Offer { src, .. } | Self::Answer { src, .. } | Self::Candidate { src, .. } => {
                Some(src)
            }
            Self::Leave { src } => Some(src),
        }
    }
}

/// Messages the broker may send to a client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "OPEN")]
    Open { #[serde(rename = "peerId")] peer_id: String },
    #[serde(rename = "OFFER")]
    Offer { src: String, payload: RawPayload },
    #[serde(rename = "ANSWER")]
    Answer { src: String, payload: RawPayload },
    #[serde(rename = "CANDIDATE")]
    Candidate { src: String, payload: RawPayload },
    #[serde(rename = "LEAVE")]
    Leave { #[serde(rename = "peerId")] peer_id: String },
    #[serde(rename = "EXPIRE")]
    Expire { #[serde(rename = "peerId")] peer_id: String },
    #[serde(rename = "ERROR")]
    Error { payload: ErrorPayload },
}

impl ServerMessage {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            payload: ErrorPayload {
                kind,
                message: message.into(),
            },
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("ServerMessage always serializes")
    }
}

/// The finite set of wire-visible error kinds.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    InvalidMessage,
    UnknownPeer,
    RateLimitExceeded,
    RoomFull,
    InternalError,
}

/// The known `type` tags on the client side of the wire, used to tell a
/// genuinely unknown message kind apart from a known kind with a malformed
/// body.
const KNOWN_CLIENT_TYPES: &[&str] = &["HEARTBEAT", "OFFER", "ANSWER", "CANDIDATE", "LEAVE"];

/// Why [`parse_client_message`] rejected a frame, carrying the exact wire
/// message text prescribed for each case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    InvalidJson,
    UnknownType,
    SchemaInvalid(String),
}

impl ParseError {
    pub fn wire_message(&self) -> String {
        match self {
            Self::InvalidJson => "Invalid JSON format".to_string(),
            Self::UnknownType => "Unknown message type".to_string(),
            Self::SchemaInvalid(detail) => detail.clone(),
        }
    }
}

/// Parse a raw inbound frame into a [`ClientMessage`], distinguishing
/// syntactically invalid JSON, an unrecognized `type` tag, and a known
/// type with a malformed body — each carries a different wire error text.
pub fn parse_client_message(text: &str) -> Result<ClientMessage, ParseError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|_| ParseError::InvalidJson)?;

    let type_tag = value.get("type").and_then(serde_json::Value::as_str);
    match type_tag {
        Some(t) if KNOWN_CLIENT_TYPES.contains(&t) => {}
        _ => return Err(ParseError::UnknownType),
    }

    serde_json::from_value(value).map_err(|e| ParseError::SchemaInvalid(e.to_string()))
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
}
