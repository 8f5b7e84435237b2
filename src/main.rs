//! PeerJS-compatible Signaling Broker - Main Entry Point

use anyhow::Result;
use tracing::info;

use peerjs_broker::config::Config;
use peerjs_broker::dispatcher::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "peerjs_broker=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting PeerJS signaling broker"
    );

    let bind_address = config.bind_address.clone();
    let state = AppState::new(config);
    let app = dispatcher::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "Server listening");

    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C signal handler");
        info!("received shutdown signal, cleaning up...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("server shutdown complete");
    Ok(())
}
