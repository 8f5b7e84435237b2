//! Upgrade-time errors that map directly to HTTP status codes.
//!
//! Distinct from [`crate::message::ErrorKind`], which is the wire-level
//! error surfaced to an already-connected peer. Nothing here reaches the
//! WebSocket wire.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("missing required query parameter: {0}")]
    MissingParam(&'static str),

    #[error("invalid peer id")]
    InvalidPeerId,

    #[error("room is full")]
    RoomFull,

    #[error("failed to register peer")]
    RegistrationFailed,

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MissingParam(_) | Self::InvalidPeerId => StatusCode::BAD_REQUEST,
            Self::RoomFull => StatusCode::TOO_MANY_REQUESTS,
            Self::RegistrationFailed | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
