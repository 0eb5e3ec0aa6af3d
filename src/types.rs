//! Basic type definitions for the chat room
//!
//! Provides:
//! - `ClientId`: UUID-based unique client identifier
//! - `UserData`: the identity attached to a connection at registration

use serde::Deserialize;
use uuid::Uuid;

/// Unique client identifier (newtype pattern)
///
/// Wraps a UUID v4 for type-safe client identification.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User data decoded from the `auth` cookie
///
/// Only `name` is required; the rest feed avatar lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserData {
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub userid: Option<String>,
}

impl UserData {
    /// User data carrying only a display name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
