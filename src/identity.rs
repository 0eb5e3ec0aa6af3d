//! Identity extraction from handshake metadata
//!
//! The `auth` cookie carries base64-encoded JSON user data, e.g.
//! `auth=eyJuYW1lIjoiQWxpY2UifQ==` for `{"name":"Alice"}`.

use base64::{engine::general_purpose, Engine as _};
use tokio_tungstenite::tungstenite::http::{header, HeaderMap};

use crate::error::IdentityError;
use crate::types::UserData;

/// Name of the cookie holding user data
pub const AUTH_COOKIE: &str = "auth";

/// Extracts user data from request headers
pub trait IdentityExtractor: Send + Sync {
    fn identify(&self, headers: &HeaderMap) -> Result<UserData, IdentityError>;
}

/// Reads user data from the `auth` cookie
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthCookie;

impl IdentityExtractor for AuthCookie {
    fn identify(&self, headers: &HeaderMap) -> Result<UserData, IdentityError> {
        let value = find_cookie(headers, AUTH_COOKIE).ok_or(IdentityError::MissingCookie)?;
        decode_user_data(value)
    }
}

/// Decode a base64 JSON user data blob
pub fn decode_user_data(value: &str) -> Result<UserData, IdentityError> {
    let raw = general_purpose::STANDARD.decode(value.trim())?;
    let user: UserData = serde_json::from_slice(&raw)?;
    if user.name.trim().is_empty() {
        return Err(IdentityError::MissingName);
    }
    Ok(user)
}

fn find_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::tungstenite::http::HeaderValue;

    const ALICE: &str = "eyJuYW1lIjoiQWxpY2UiLCJhdmF0YXJfdXJsIjoiaHR0cDovL2EvYi5wbmcifQ==";

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_identify_from_cookie() {
        let headers = headers_with_cookie(&format!("theme=dark; auth={}", ALICE));
        let user = AuthCookie.identify(&headers).unwrap();

        assert_eq!(user.name, "Alice");
        assert_eq!(user.avatar_url.as_deref(), Some("http://a/b.png"));
    }

    #[test]
    fn test_missing_cookie() {
        let headers = headers_with_cookie("theme=dark");
        assert!(matches!(
            AuthCookie.identify(&headers),
            Err(IdentityError::MissingCookie)
        ));
        assert!(matches!(
            AuthCookie.identify(&HeaderMap::new()),
            Err(IdentityError::MissingCookie)
        ));
    }

    #[test]
    fn test_invalid_cookie_value() {
        let headers = headers_with_cookie("auth=%%%not-base64");
        assert!(matches!(
            AuthCookie.identify(&headers),
            Err(IdentityError::Decode(_))
        ));

        // "bm90IGpzb24=" is "not json"
        let headers = headers_with_cookie("auth=bm90IGpzb24=");
        assert!(matches!(
            AuthCookie.identify(&headers),
            Err(IdentityError::Json(_))
        ));
    }

    #[test]
    fn test_empty_name_rejected() {
        // {"name":""}
        let headers = headers_with_cookie("auth=eyJuYW1lIjoiIn0=");
        assert!(matches!(
            AuthCookie.identify(&headers),
            Err(IdentityError::MissingName)
        ));
    }
}
