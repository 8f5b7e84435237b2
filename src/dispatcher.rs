//! The dispatcher: a stateless HTTP/WebSocket router in front of the
//! population of room actors. Routes requests by room token, spawning a
//! room actor lazily on first contact and reusing it for every subsequent
//! peer in that room.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::{header, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use dashmap::DashMap;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::room::{self, RoomCommand};
use crate::ws;

/// Best-effort process-wide counters surfaced at `/metrics`. Never gates
/// behavior; losing an increment to a race is acceptable.
#[derive(Default)]
pub struct Metrics {
    pub rooms_created: AtomicU64,
    pub peers_registered: AtomicU64,
    pub errors_total: AtomicU64,
}

/// Shared dispatcher state, cloned into every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    rooms: Arc<DashMap<String, tokio::sync::mpsc::Sender<RoomCommand>>>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            rooms: Arc::new(DashMap::new()),
            metrics: Arc::new(Metrics::default()),
        }
    }

    /// Look up the mailbox for `token`'s room actor, spawning one if this
    /// is the first peer to reach this room.
    pub fn room_mailbox(&self, token: &str) -> tokio::sync::mpsc::Sender<RoomCommand> {
        if let Some(existing) = self.rooms.get(token) {
            return existing.clone();
        }
        let mailbox = room::spawn(token.to_string(), self.config.clone());
        self.metrics.rooms_created.fetch_add(1, Ordering::Relaxed);
        self.rooms.insert(token.to_string(), mailbox.clone());
        mailbox
    }

    /// Drop a room's mailbox once its actor has exited. Called opportunistically;
    /// a stale entry just costs one extra `send` failure, never correctness.
    pub fn forget_room(&self, token: &str) {
        self.rooms.remove(token);
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }
}

/// Milliseconds since the Unix epoch, for the operational HTTP envelopes.
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the Unix epoch")
        .as_millis() as u64
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: u64,
    version: &'static str,
}

/// Signaling protocol version reported at `/health`, independent of the
/// crate's own `Cargo.toml` version.
const PROTOCOL_VERSION: &str = "1.0.0";

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        timestamp: now_millis(),
        version: PROTOCOL_VERSION,
    })
}

#[derive(Serialize)]
struct MetricsBody {
    #[serde(rename = "activeRooms")]
    active_rooms: usize,
    #[serde(rename = "activePeers")]
    active_peers: u64,
    #[serde(rename = "messagesPerSecond")]
    messages_per_second: u64,
    #[serde(rename = "errorRate")]
    error_rate: u64,
}

#[derive(Serialize)]
struct MetricsResponse {
    status: &'static str,
    timestamp: u64,
    metrics: MetricsBody,
}

async fn metrics(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    Json(MetricsResponse {
        status: "ok",
        timestamp: now_millis(),
        metrics: MetricsBody {
            active_rooms: state.active_rooms(),
            active_peers: state.metrics.peers_registered.load(Ordering::Relaxed),
            messages_per_second: 0,
            error_rate: state.metrics.errors_total.load(Ordering::Relaxed),
        },
    })
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "not found")
}

/// Build the application router: CORS, health, metrics, and the signaling
/// upgrade endpoint.
#[must_use]
pub fn create_router(state: AppState) -> Router {
    let cors = if state.config.allowed_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = state
            .config
            .allowed_origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    tracing::warn!(origin = %o, "invalid CORS origin in configuration, skipping");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/peerjs", get(ws::handler))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
