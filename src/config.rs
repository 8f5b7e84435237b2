//! Server Configuration
//!
//! Loads configuration from environment variables.

use std::time::Duration;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:8080")
    pub bind_address: String,

    /// CORS allow-list. `*` is permitted only when the list contains it
    /// literally; otherwise the dispatcher echoes the first allowed origin.
    pub allowed_origins: Vec<String>,

    /// Maximum peers admitted into a single room.
    pub max_peers_per_room: usize,

    /// A peer is expired if this long has elapsed since its last heartbeat.
    pub heartbeat_timeout: Duration,

    /// Per-peer sliding-window rate limit: max messages per window.
    pub rate_limit_max: u32,

    /// Per-peer sliding-window rate limit: window duration.
    pub rate_limit_window: Duration,

    /// Maximum age of a pending (undelivered) queued message.
    pub queue_ttl: Duration,

    /// Maximum number of messages queued per undelivered destination peer.
    pub queue_max_per_peer: usize,

    /// Maximum accepted inbound frame size, in bytes.
    pub max_frame_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// sensible defaults for anything unset.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            bind_address: std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|s| {
                    s.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            max_peers_per_room: env_parse("MAX_PEERS_PER_ROOM", 4),
            heartbeat_timeout: Duration::from_millis(env_parse("HEARTBEAT_TIMEOUT_MS", 5_000)),
            rate_limit_max: env_parse("RATE_LIMIT_MAX", 100),
            rate_limit_window: Duration::from_millis(env_parse("RATE_LIMIT_WINDOW_MS", 1_000)),
            queue_ttl: Duration::from_millis(env_parse("QUEUE_TTL_MS", 5_000)),
            queue_max_per_peer: env_parse("QUEUE_MAX_PER_PEER", 50),
            max_frame_bytes: env_parse("MAX_FRAME_BYTES", 1_048_576),
        }
    }

    /// Whether `origin` is allowed by the configured CORS allow-list.
    #[must_use]
    pub fn allows_origin(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == "*" || o == origin)
    }

    /// A default configuration for tests.
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            bind_address: "127.0.0.1:0".into(),
            allowed_origins: vec!["*".into()],
            max_peers_per_room: 4,
            heartbeat_timeout: Duration::from_millis(5_000),
            rate_limit_max: 100,
            rate_limit_window: Duration::from_millis(1_000),
            queue_ttl: Duration::from_millis(5_000),
            queue_max_per_peer: 50,
            max_frame_bytes: 1_048_576,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
