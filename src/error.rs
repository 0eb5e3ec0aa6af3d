//! Error types for the chat room
//!
//! Defines connection-level errors and the failures that can abort a single
//! registration attempt. Uses thiserror for ergonomic error definitions.
//!
//! None of these ever reach the room's control loop: they stop at the
//! connection task that produced them.

use thiserror::Error;

/// Application-level errors
///
/// Every variant is fatal to one connection only.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol or handshake error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The handshake carried no usable identity
    #[error("Identity rejected: {0}")]
    Identity(#[from] IdentityError),

    /// The room's control loop is no longer running
    #[error("Room closed")]
    RoomClosed,
}

/// Errors surfaced by a [`Connection`](crate::connection::Connection) half
///
/// The client pumps treat all of these as a normal end of the connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Peer closed the connection or the stream ended
    #[error("Connection closed")]
    Closed,

    /// Transport-level failure
    #[error("Protocol error: {0}")]
    Protocol(#[from] tokio_tungstenite::tungstenite::Error),

    /// A frame could not be decoded into an inbound message
    #[error("Invalid frame: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Identity extraction errors
#[derive(Debug, Error)]
pub enum IdentityError {
    /// No `auth` cookie on the request
    #[error("auth cookie missing")]
    MissingCookie,

    /// Cookie value is not valid base64
    #[error("auth cookie is not base64: {0}")]
    Decode(#[from] base64::DecodeError),

    /// Decoded cookie is not the expected JSON object
    #[error("auth cookie is not valid user data: {0}")]
    Json(#[from] serde_json::Error),

    /// User data has an empty name
    #[error("user name is empty")]
    MissingName,
}

/// Avatar lookup errors
#[derive(Debug, Error)]
pub enum AvatarError {
    /// The avatar service could not produce a URL for this user
    #[error("no avatar URL available")]
    NoAvatarUrl,
}
