//! Internal data structures
//!
//! Credential material held by a single client instance. The raw cookie is
//! supplied by the caller; the session id and bearer token are derived from
//! it lazily and invalidated independently.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// Credential set owned by one client
#[derive(Clone, Default)]
pub struct Credentials {
    /// Raw `Cookie` header value
    pub raw_cookie: String,
    /// Clerk session identifier (SID)
    pub session_id: Option<String>,
    /// Short-lived bearer token minted from the SID
    pub bearer_token: Option<BearerToken>,
}

impl Credentials {
    /// Create credentials from a raw cookie string
    pub fn new(raw_cookie: impl Into<String>) -> Self {
        Self {
            raw_cookie: raw_cookie.into(),
            session_id: None,
            bearer_token: None,
        }
    }

    /// Drop the bearer token only (expired auth)
    pub fn invalidate_token(&mut self) {
        self.bearer_token = None;
    }

    /// Drop both derived values (full re-authentication)
    pub fn invalidate_all(&mut self) {
        self.session_id = None;
        self.bearer_token = None;
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("raw_cookie", &fingerprint(&self.raw_cookie))
            .field("session_id", &self.session_id)
            .field("bearer_token", &self.bearer_token)
            .finish()
    }
}

/// Opaque bearer token (a Clerk-issued JWT)
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

#[derive(Deserialize)]
struct JwtClaims {
    exp: Option<i64>,
}

impl BearerToken {
    /// Wrap a raw token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }

    /// Expiry decoded from the JWT payload, if it is a well-formed JWT.
    /// The signature is not checked; this is only used for diagnostics.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let payload = self.0.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        let claims: JwtClaims = serde_json::from_slice(&bytes).ok()?;
        DateTime::from_timestamp(claims.exp?, 0)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BearerToken({})", fingerprint(&self.0))
    }
}

/// Short prefix of a secret, safe to log
pub fn fingerprint(secret: &str) -> String {
    if secret.is_empty() {
        return "<empty>".to_string();
    }
    let prefix: String = secret.chars().take(6).collect();
    format!("{}…({} chars)", prefix, secret.chars().count())
}
