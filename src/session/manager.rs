//! # Session Management Module
//!
//! The [`SessionManager`] owns the derivation chain
//! `cookie -> session id -> bearer token`:
//!
//! - the session id is resolved lazily and cached until invalidated
//! - bearer tokens are minted from the session id on demand
//! - session extension and keep-alive are best effort
//!
//! All derivation steps are serialized by an internal lock, so concurrent
//! callers never resolve the same session id twice.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use suno_client::config::Settings;
//! use suno_client::session::{CredentialStore, SessionManager};
//! use suno_client::transport::build_client;
//!
//! # tokio_test::block_on(async {
//! let settings = Settings::new("__client=...");
//! let http = build_client(&settings.api, false)?;
//! let store = Arc::new(CredentialStore::new(settings.auth.cookie.clone()));
//! let manager = SessionManager::new(&settings, http, store);
//!
//! let sid = manager.ensure_session().await?;
//! let token = manager.renew().await?;
//! println!("session {sid}, token expires at {:?}", token.expires_at());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

use super::credentials::CredentialStore;
use super::identity::{ClerkClient, IdentityProvider};
use crate::{
    Result,
    config::Settings,
    types::{BearerToken, internal::fingerprint},
};
use reqwest::{
    Client,
    header::{AUTHORIZATION, COOKIE},
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Convenience type alias for SessionManager with the Clerk provider
pub type SessionManager = SessionManagerGeneric<ClerkClient>;

/// Session manager generic over the identity provider
#[derive(Debug)]
pub struct SessionManagerGeneric<P: IdentityProvider = ClerkClient> {
    /// Shared credential state
    store: Arc<CredentialStore>,
    /// Identity provider used for session lookup and token minting
    identity: Arc<P>,
    /// HTTP client for content API calls made on behalf of the session
    http_client: Client,
    /// Session extension endpoint
    extend_url: String,
    /// Serializes derivation steps
    lock: Mutex<()>,
}

#[derive(Debug, Deserialize)]
struct ExtendResponse {
    #[serde(default)]
    is_extended: bool,
    session_id: Option<String>,
}

impl SessionManagerGeneric<ClerkClient> {
    /// Create a session manager backed by Clerk
    pub fn new(settings: &Settings, http_client: Client, store: Arc<CredentialStore>) -> Self {
        let clerk = ClerkClient::new(http_client.clone(), &settings.auth);
        Self::with_provider(settings, http_client, store, clerk)
    }
}

impl<P: IdentityProvider> SessionManagerGeneric<P> {
    /// Create a session manager with a custom identity provider
    pub fn with_provider(
        settings: &Settings,
        http_client: Client,
        store: Arc<CredentialStore>,
        provider: P,
    ) -> Self {
        Self {
            store,
            identity: Arc::new(provider),
            http_client,
            extend_url: format!(
                "{}/user/extend_session_id/",
                settings.api.base_url.trim_end_matches('/')
            ),
            lock: Mutex::new(()),
        }
    }

    /// Credential store shared with the request executor
    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Return the cached session id, resolving it first if needed.
    ///
    /// Idempotent: once cached, no further identity calls are made until
    /// the credentials are invalidated.
    pub async fn ensure_session(&self) -> Result<String> {
        let _guard = self.lock.lock().await;
        self.ensure_session_locked().await
    }

    /// Mint a fresh bearer token without installing it
    pub async fn mint_token(&self) -> Result<BearerToken> {
        let _guard = self.lock.lock().await;
        self.mint_token_locked().await
    }

    /// Mint a bearer token and install it for subsequent requests
    pub async fn renew(&self) -> Result<BearerToken> {
        let _guard = self.lock.lock().await;
        let token = self.mint_token_locked().await?;
        self.store.set_bearer_token(token.clone()).await;
        tracing::info!("Bearer token renewed");
        Ok(token)
    }

    /// Drop every derived credential and resolve them again
    pub async fn reauthenticate(&self) -> Result<BearerToken> {
        self.store.invalidate_all().await;
        tracing::info!("Credentials invalidated, re-authenticating");
        self.renew().await
    }

    /// Ping the identity provider to keep the session warm. Never fails.
    pub async fn touch_session(&self) -> bool {
        let _guard = self.lock.lock().await;
        let sid = match self.ensure_session_locked().await {
            Ok(sid) => sid,
            Err(e) => {
                tracing::warn!("Cannot touch session: {}", e);
                return false;
            }
        };
        let cookie = self.store.cookie().await;
        match self.identity.touch(&cookie, &sid).await {
            Ok(()) => {
                tracing::debug!("Session {} touched", fingerprint(&sid));
                true
            }
            Err(e) => {
                tracing::warn!("Session touch failed: {}", e);
                false
            }
        }
    }

    /// Ask the content API to extend the session id.
    ///
    /// On success the returned session id replaces the cached one and the
    /// bearer token is dropped. Failures are logged and reported as `false`.
    pub async fn extend_session(&self) -> bool {
        let _guard = self.lock.lock().await;
        let sid = match self.ensure_session_locked().await {
            Ok(sid) => sid,
            Err(e) => {
                tracing::warn!("Cannot extend session: {}", e);
                return false;
            }
        };

        let creds = self.store.snapshot().await;
        let mut request = self
            .http_client
            .post(&self.extend_url)
            .header(COOKIE, creds.raw_cookie.as_str())
            .json(&serde_json::json!({ "session_id": sid }));
        if let Some(token) = &creds.bearer_token {
            request = request.header(AUTHORIZATION, token.header_value());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Session extension request failed: {}", e);
                return false;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Session extension rejected with HTTP {}", status.as_u16());
            return false;
        }

        match response.json::<ExtendResponse>().await {
            Ok(ExtendResponse {
                is_extended: true,
                session_id: Some(new_sid),
            }) if !new_sid.is_empty() => {
                tracing::info!("Session extended, new session id {}", fingerprint(&new_sid));
                self.store.set_session_id(new_sid).await;
                self.store.invalidate_token().await;
                true
            }
            Ok(other) => {
                tracing::warn!("Session was not extended: {:?}", other);
                false
            }
            Err(e) => {
                tracing::warn!("Unreadable session extension response: {}", e);
                false
            }
        }
    }

    async fn ensure_session_locked(&self) -> Result<String> {
        if let Some(sid) = self.store.session_id().await {
            return Ok(sid);
        }

        let cookie = self.store.cookie().await;
        let sid = self.identity.last_active_session(&cookie).await?;
        tracing::info!("Resolved session id {}", fingerprint(&sid));
        self.store.set_session_id(sid.clone()).await;
        Ok(sid)
    }

    async fn mint_token_locked(&self) -> Result<BearerToken> {
        let sid = self.ensure_session_locked().await?;
        let cookie = self.store.cookie().await;

        match self.identity.mint_token(&cookie, &sid).await {
            Ok(token) => {
                tracing::debug!("Minted bearer token, expires at {:?}", token.expires_at());
                Ok(token)
            }
            Err(e) => {
                // A stale session id cannot mint; resolve it again next time
                if matches!(e.status(), Some(401 | 404)) {
                    self.store.invalidate_all().await;
                }
                Err(e)
            }
        }
    }
}
