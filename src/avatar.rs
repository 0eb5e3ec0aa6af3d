//! Avatar lookup
//!
//! Resolves the avatar reference stamped onto each outgoing message.

use crate::error::AvatarError;
use crate::types::UserData;

/// Produces an avatar URL for a user
pub trait Avatar: Send + Sync {
    fn avatar_url(&self, user: &UserData) -> Result<String, AvatarError>;
}

/// Uses the avatar URL carried in the user's auth data
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthAvatar;

impl Avatar for AuthAvatar {
    fn avatar_url(&self, user: &UserData) -> Result<String, AvatarError> {
        match user.avatar_url.as_deref() {
            Some(url) if !url.is_empty() => Ok(url.to_string()),
            _ => Err(AvatarError::NoAvatarUrl),
        }
    }
}

/// Derives a Gravatar URL from the user's email
#[derive(Debug, Clone, Copy, Default)]
pub struct GravatarAvatar;

impl Avatar for GravatarAvatar {
    fn avatar_url(&self, user: &UserData) -> Result<String, AvatarError> {
        let email = user
            .email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .ok_or(AvatarError::NoAvatarUrl)?;
        let digest = md5::compute(email.as_bytes());
        Ok(format!("//www.gravatar.com/avatar/{:x}", digest))
    }
}
