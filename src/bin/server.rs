//! Runnable WebSocket match server.
//!
//! ```sh
//! cargo run --features bin
//!
//! # Override the listen address or grace window:
//! NOUGHTS_ADDR=0.0.0.0:9000 NOUGHTS_GRACE_SECS=60 cargo run --features bin
//! ```

use std::time::Duration;

use noughts_server::{MatchServer, ServerConfig};

/// Default listen address when `NOUGHTS_ADDR` is not set.
const DEFAULT_ADDR: &str = "127.0.0.1:8080";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing. Set `RUST_LOG=debug` for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("NOUGHTS_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let mut config = ServerConfig::new();
    if let Ok(secs) = std::env::var("NOUGHTS_GRACE_SECS") {
        config = config.with_grace_period(Duration::from_secs(secs.parse()?));
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("match server listening on ws://{addr}");

    let server = MatchServer::new(config);
    tokio::select! {
        result = noughts_server::transports::websocket::serve(listener, server) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }
    Ok(())
}
