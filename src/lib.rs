//! Single-Room WebSocket Chat Server Library
//!
//! A broadcast chat room built with tokio-tungstenite using the Actor
//! pattern for membership and fan-out.
//!
//! # Features
//! - WebSocket connection handling with cookie-based identity
//! - One room, every message fanned out to every member
//! - Avatar lookup (auth data or Gravatar)
//! - Slow consumers are disconnected instead of stalling the room
//! - Optional human-readable trace of room activity
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `Room` is the actor owning the member set
//! - Each connection runs a read pump and a write pump joined by a
//!   bounded mailbox
//! - No locks needed - all state access goes through message passing
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use chat_room::{server, ChatRoom, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig::default();
//!     let listener = TcpListener::bind(&config.addr).await.unwrap();
//!     let (chat, _room_task) = ChatRoom::start(&config);
//!
//!     server::serve(listener, chat, std::future::pending()).await.unwrap();
//! }
//! ```

pub mod avatar;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod identity;
pub mod message;
pub mod room;
pub mod server;
pub mod trace;
pub mod types;
pub mod ws;

// Re-export main types for convenience
pub use client::Client;
pub use config::{Cli, EchoPolicy, RoomConfig, ServerConfig, TraceKind};
pub use error::{AppError, ConnectionError, IdentityError};
pub use handler::ChatRoom;
pub use message::{InboundMessage, Message};
pub use room::{Departure, Room, RoomEvent, RoomHandle};
pub use trace::Tracer;
pub use types::{ClientId, UserData};
