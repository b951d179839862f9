//! Upstream credential resolution.
//!
//! Order: the client's `Authorization: Bearer` token, then the server's
//! `HF_TOKEN`, then a placeholder the router will reject. The placeholder makes
//! a missing credential fail upstream with a clear auth error instead of the
//! proxy inventing one.

use actix_web::http::header::{HeaderMap, AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};

pub const PLACEHOLDER_API_KEY: &str = "client-api-key-required";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Client,
    ServerDefault,
    Placeholder,
}

#[derive(Debug)]
pub struct ResolvedKey {
    pub key: SecretString,
    pub source: KeySource,
}

impl ResolvedKey {
    /// Key with the middle elided, safe for logs.
    pub fn masked(&self) -> String {
        mask_key(self.key.expose_secret())
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

pub fn resolve_api_key(
    client_key: Option<&str>,
    server_default: Option<&SecretString>,
) -> ResolvedKey {
    if let Some(key) = client_key.filter(|k| !k.is_empty()) {
        return ResolvedKey {
            key: SecretString::from(key.to_string()),
            source: KeySource::Client,
        };
    }

    if let Some(key) = server_default.filter(|k| !k.expose_secret().is_empty()) {
        return ResolvedKey {
            key: SecretString::from(key.expose_secret().to_string()),
            source: KeySource::ServerDefault,
        };
    }

    ResolvedKey {
        key: SecretString::from(PLACEHOLDER_API_KEY.to_string()),
        source: KeySource::Placeholder,
    }
}

pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "***".to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::HeaderValue;

    fn headers(auth: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
        h
    }

    #[test]
    fn parses_bearer_header() {
        assert_eq!(bearer_token(&headers("Bearer hf_abc")), Some("hf_abc"));
        assert_eq!(bearer_token(&headers("bearer   hf_abc ")), Some("hf_abc"));
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn client_key_wins() {
        let default = SecretString::from("hf_server_default_token".to_string());
        let key = resolve_api_key(Some("hf_client"), Some(&default));
        assert_eq!(key.source, KeySource::Client);
        assert_eq!(key.key.expose_secret(), "hf_client");
    }

    #[test]
    fn falls_back_to_server_default() {
        let default = SecretString::from("hf_server_default_token".to_string());
        let key = resolve_api_key(None, Some(&default));
        assert_eq!(key.source, KeySource::ServerDefault);
        assert_eq!(key.key.expose_secret(), "hf_server_default_token");
    }

    #[test]
    fn falls_back_to_placeholder() {
        let empty = SecretString::from(String::new());
        let key = resolve_api_key(Some(""), Some(&empty));
        assert_eq!(key.source, KeySource::Placeholder);
        assert_eq!(key.key.expose_secret(), PLACEHOLDER_API_KEY);
    }

    #[test]
    fn masks_keys() {
        assert_eq!(mask_key("hf_abcdefghijklmnop"), "hf_abc...mnop");
        assert_eq!(mask_key("short"), "***");
    }
}
