//! Credential store
//!
//! Holds the credential set of one client instance. Every mutation goes
//! through here so the request executor sees renewed tokens and refreshed
//! cookies on its next attempt.

use super::cookies::{CookieJar, SESSION_JWT_COOKIE, merge_cookie_string};
use crate::types::{BearerToken, Credentials};
use tokio::sync::RwLock;

/// Credential storage with independent invalidation of derived values
#[derive(Debug)]
pub struct CredentialStore {
    inner: RwLock<Credentials>,
}

impl CredentialStore {
    /// Create a store from the raw cookie string
    pub fn new(raw_cookie: impl Into<String>) -> Self {
        Self {
            inner: RwLock::new(Credentials::new(raw_cookie)),
        }
    }

    /// Copy of the current credentials
    pub async fn snapshot(&self) -> Credentials {
        self.inner.read().await.clone()
    }

    /// Current `Cookie` header value
    pub async fn cookie(&self) -> String {
        self.inner.read().await.raw_cookie.clone()
    }

    /// Cached session id
    pub async fn session_id(&self) -> Option<String> {
        self.inner.read().await.session_id.clone()
    }

    /// Cache a session id
    pub async fn set_session_id(&self, session_id: impl Into<String>) {
        self.inner.write().await.session_id = Some(session_id.into());
    }

    /// Current bearer token
    pub async fn bearer_token(&self) -> Option<BearerToken> {
        self.inner.read().await.bearer_token.clone()
    }

    /// Install a bearer token for subsequent requests
    pub async fn set_bearer_token(&self, token: BearerToken) {
        self.inner.write().await.bearer_token = Some(token);
    }

    /// Drop the bearer token only
    pub async fn invalidate_token(&self) {
        self.inner.write().await.invalidate_token();
    }

    /// Drop session id and bearer token
    pub async fn invalidate_all(&self) {
        self.inner.write().await.invalidate_all();
    }

    /// Merge cookies returned by a challenge resolver. A refreshed Clerk
    /// session cookie is adopted as the bearer token.
    pub async fn apply_refreshed_cookies(&self, refreshed: &CookieJar) {
        let mut creds = self.inner.write().await;
        creds.raw_cookie = merge_cookie_string(&creds.raw_cookie, refreshed);
        match refreshed.get(SESSION_JWT_COOKIE) {
            Some(jwt) if !jwt.is_empty() => creds.bearer_token = Some(BearerToken::new(jwt.clone())),
            _ => creds.invalidate_token(),
        }
        tracing::debug!("Installed {} refreshed cookies", refreshed.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::cookies::parse_cookie_string;

    #[tokio::test]
    async fn test_store_starts_without_derived_values() {
        let store = CredentialStore::new("__client=abc");
        assert_eq!(store.cookie().await, "__client=abc");
        assert!(store.session_id().await.is_none());
        assert!(store.bearer_token().await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_token_keeps_sid() {
        let store = CredentialStore::new("__client=abc");
        store.set_session_id("sess_1").await;
        store.set_bearer_token(BearerToken::new("jwt")).await;

        store.invalidate_token().await;

        assert_eq!(store.session_id().await.as_deref(), Some("sess_1"));
        assert!(store.bearer_token().await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let store = CredentialStore::new("__client=abc");
        store.set_session_id("sess_1").await;
        store.set_bearer_token(BearerToken::new("jwt")).await;

        store.invalidate_all().await;

        let creds = store.snapshot().await;
        assert!(creds.session_id.is_none());
        assert!(creds.bearer_token.is_none());
    }

    #[tokio::test]
    async fn test_refreshed_session_cookie_becomes_bearer() {
        let store = CredentialStore::new("__client=abc; keep=1");
        let mut refreshed = CookieJar::new();
        refreshed.insert("__session".to_string(), "fresh.jwt.value".to_string());
        refreshed.insert("__client".to_string(), "def".to_string());

        store.apply_refreshed_cookies(&refreshed).await;

        let jar = parse_cookie_string(&store.cookie().await);
        assert_eq!(jar["__client"], "def");
        assert_eq!(jar["keep"], "1");
        assert_eq!(
            store.bearer_token().await.unwrap().as_str(),
            "fresh.jwt.value"
        );
    }

    #[tokio::test]
    async fn test_refreshed_cookies_without_session_drop_token() {
        let store = CredentialStore::new("__client=abc");
        store.set_bearer_token(BearerToken::new("stale")).await;
        let mut refreshed = CookieJar::new();
        refreshed.insert("cf_clearance".to_string(), "ok".to_string());

        store.apply_refreshed_cookies(&refreshed).await;

        assert!(store.bearer_token().await.is_none());
    }
}
