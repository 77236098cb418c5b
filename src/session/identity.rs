//! Identity provider integration
//!
//! Talks to the Clerk frontend API that backs Suno's login: it resolves the
//! active session id from the cookie and mints short-lived JWTs for it.

use crate::{Error, Result, config::AuthSettings, types::BearerToken};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::COOKIE};
use serde::Deserialize;

/// Identity operations the session manager depends on
#[async_trait]
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    /// Resolve the last active session id for the cookie
    async fn last_active_session(&self, cookie: &str) -> Result<String>;

    /// Mint a bearer token for a session id
    async fn mint_token(&self, cookie: &str, session_id: &str) -> Result<BearerToken>;

    /// Mark the session as recently used
    async fn touch(&self, cookie: &str, session_id: &str) -> Result<()>;
}

/// Clerk frontend API client
#[derive(Debug, Clone)]
pub struct ClerkClient {
    client: Client,
    base_url: String,
    api_version: String,
    js_version: String,
}

#[derive(Deserialize)]
struct ClientEnvelope {
    response: Option<ClientState>,
}

#[derive(Deserialize)]
struct ClientState {
    last_active_session_id: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    jwt: Option<String>,
}

impl ClerkClient {
    /// Create a Clerk client sharing the given HTTP client
    pub fn new(client: Client, settings: &AuthSettings) -> Self {
        Self {
            client,
            base_url: settings.clerk_base_url.trim_end_matches('/').to_string(),
            api_version: settings.clerk_api_version.clone(),
            js_version: settings.clerk_js_version.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}{}?__clerk_api_version={}&_clerk_js_version={}",
            self.base_url, path, self.api_version, self.js_version
        )
    }
}

#[async_trait]
impl IdentityProvider for ClerkClient {
    async fn last_active_session(&self, cookie: &str) -> Result<String> {
        let response = self
            .client
            .get(self.url("/client"))
            .header(COOKIE, cookie)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Session lookup request failed: {}", e);
                Error::auth("session lookup", None)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::auth("session lookup", Some(status.as_u16())));
        }

        let envelope: ClientEnvelope = response
            .json()
            .await
            .map_err(|_| Error::auth("session lookup", Some(status.as_u16())))?;

        envelope
            .response
            .and_then(|state| state.last_active_session_id)
            .filter(|sid| !sid.is_empty())
            .ok_or_else(|| Error::auth("session lookup (no active session, cookie expired?)", None))
    }

    async fn mint_token(&self, cookie: &str, session_id: &str) -> Result<BearerToken> {
        let response = self
            .client
            .post(self.url(&format!("/client/sessions/{}/tokens", session_id)))
            .header(COOKIE, cookie)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Token minting request failed: {}", e);
                Error::auth("token minting", None)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::auth("token minting", Some(status.as_u16())));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|_| Error::auth("token minting", Some(status.as_u16())))?;

        token
            .jwt
            .filter(|jwt| !jwt.is_empty())
            .map(BearerToken::new)
            .ok_or_else(|| Error::auth("token minting (empty token)", Some(status.as_u16())))
    }

    async fn touch(&self, cookie: &str, session_id: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/client/sessions/{}/touch", session_id)))
            .header(COOKIE, cookie)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => {
                Err(Error::auth("session touch", Some(response.status().as_u16())))
            }
            status => Err(Error::upstream(
                status.as_u16(),
                response.text().await.unwrap_or_default(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_carries_clerk_versions() {
        let clerk = ClerkClient::new(Client::new(), &AuthSettings::default());
        assert_eq!(
            clerk.url("/client"),
            "https://clerk.suno.com/v1/client?__clerk_api_version=2021-02-05&_clerk_js_version=5.35.1"
        );
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let settings = AuthSettings {
            clerk_base_url: "http://127.0.0.1:9000/v1/".to_string(),
            ..AuthSettings::default()
        };
        let clerk = ClerkClient::new(Client::new(), &settings);
        assert!(clerk.url("/client/sessions/sess_1/tokens").starts_with(
            "http://127.0.0.1:9000/v1/client/sessions/sess_1/tokens?"
        ));
    }
}
