//! Pseudonymous visitor identity.
//!
//! The browser generates a random token once, keeps it in local storage,
//! and sends it along on every visit (cookie or query parameter). The
//! server never validates or issues it; it is an advisory, spoofable
//! signal used only for approximate uniqueness counting. Never use it
//! for authorization.

use axum::http::HeaderMap;
use rand::RngExt;
use std::fmt;

/// Cookie the client-side snippet stores the token in
pub const VISITOR_COOKIE: &str = "visitor_id";

const TOKEN_LEN: usize = 22;
const MAX_TOKEN_LEN: usize = 64;
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// URL-safe random token
pub fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitorId(String);

impl VisitorId {
    /// Fresh high-entropy token for a first-time browser
    pub fn generate() -> Self {
        Self(random_token(TOKEN_LEN))
    }

    /// Accept a client-supplied token as-is, after a sanity check.
    /// Anything over-long or outside the URL-safe alphabet degrades to
    /// None and the click is recorded unattributed.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.len() > MAX_TOKEN_LEN {
            return None;
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VisitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pull the visitor token off an inbound visit request. An explicit
/// query parameter wins over the cookie.
pub fn from_request(headers: &HeaderMap, query_vid: Option<&str>) -> Option<VisitorId> {
    if let Some(vid) = query_vid.and_then(VisitorId::parse) {
        return Some(vid);
    }
    cookie_value(headers, VISITOR_COOKIE).and_then(VisitorId::parse)
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookies = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key.trim() == name {
            Some(value.trim())
        } else {
            None
        }
    })
}
