//! TCP accept loop
//!
//! Spawns one task per accepted socket, each running
//! [`ChatRoom::handle_connection`]. Per-connection failures are logged and
//! never stop the loop.

use std::future::Future;

use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::handler::ChatRoom;

/// Accept connections until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, chat: ChatRoom, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    info!("Chat room listening on {}", listener.local_addr()?);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested, no longer accepting connections");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    debug!("New connection from {}", addr);
                    let chat = chat.clone();

                    // Spawn handler task for each connection
                    tokio::spawn(async move {
                        if let Err(e) = chat.handle_connection(stream).await {
                            error!("Connection handler error for {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            },
        }
    }

    Ok(())
}
