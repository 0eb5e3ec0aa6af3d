//! Single-room WebSocket chat server - Entry Point
//!
//! Starts the Room actor and the TCP listener, accepting connections until
//! Ctrl-C.

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chat_room::{server, ChatRoom, Cli, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // e.g., RUST_LOG=debug or RUST_LOG=chat_room=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_room=info")),
        )
        .init();

    let config = ServerConfig::from(Cli::parse());

    let listener = TcpListener::bind(&config.addr).await?;
    let (chat, _room_task) = ChatRoom::start(&config);
    info!("Room actor started");

    server::serve(listener, chat, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
        }
    })
    .await?;

    Ok(())
}
