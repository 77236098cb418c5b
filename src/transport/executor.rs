//! Resilient request executor
//!
//! Every content API call goes through [`RequestExecutor::execute`]. Each
//! attempt is classified (see [`super::policy`]) and the executor reacts:
//! renew the bearer token on 401, solve or extend on 422, back off on an
//! edge-proxy block, and surface anything else unchanged. Calls on one
//! executor are serialized, so a renewal is always observed by the next
//! attempt.

use super::http::build_client;
use super::policy::{Classification, Decision, RetryPolicy, RetryState, classify};
use crate::{
    Error, Result,
    challenge::ChallengeResolver,
    config::{ApiSettings, Settings, UnprocessableStrategy},
    session::SessionManager,
};
use reqwest::{
    Client, Method, StatusCode,
    header::{AUTHORIZATION, COOKIE, HeaderMap},
};
use serde::de::DeserializeOwned;
use std::{future::Future, sync::Arc, time::Duration};
use tokio::sync::{Mutex, OnceCell};
use tokio_util::sync::CancellationToken;

/// Fully buffered upstream response
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as (lossy) UTF-8 text
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Executes content API requests under the classified-retry policy
#[derive(Debug)]
pub struct RequestExecutor {
    client: Client,
    relaxed_client: OnceCell<Client>,
    api_settings: ApiSettings,
    session: Arc<SessionManager>,
    resolver: Option<Arc<dyn ChallengeResolver>>,
    challenge_url: String,
    policy: RetryPolicy,
    relax_tls_on_failure: bool,
    unprocessable: UnprocessableStrategy,
    cancel: CancellationToken,
    gate: Mutex<()>,
}

impl RequestExecutor {
    /// Create an executor without a challenge resolver
    pub fn new(
        settings: &Settings,
        client: Client,
        session: Arc<SessionManager>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            relaxed_client: OnceCell::new(),
            api_settings: settings.api.clone(),
            session,
            resolver: None,
            challenge_url: settings.challenge.page_url.clone(),
            policy: RetryPolicy::from(&settings.retry),
            relax_tls_on_failure: settings.retry.relax_tls_on_failure,
            unprocessable: settings.retry.unprocessable,
            cancel,
            gate: Mutex::new(()),
        }
    }

    /// Attach a challenge resolver
    pub fn with_resolver(mut self, resolver: Arc<dyn ChallengeResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Whether a challenge resolver is attached
    pub fn has_resolver(&self) -> bool {
        self.resolver.is_some()
    }

    /// Session manager used for renewals
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Execute a request, absorbing transient failures
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<UpstreamResponse> {
        let _gate = self.gate.lock().await;
        let mut state = RetryState::new(&self.policy);

        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let response = self.send(&method, url, body).await?;
            let classification = classify(response.status, &response.headers);

            if classification == Classification::ChallengeRequired
                && self.resolver.is_none()
                && self.unprocessable == UnprocessableStrategy::Challenge
            {
                tracing::warn!("{} {} requires human verification", method, url);
                return Err(Error::challenge_required(self.challenge_url.clone()));
            }

            match state.next(response.status, classification) {
                Decision::Return => return Ok(response),
                Decision::Fail => {
                    return Err(Error::upstream(response.status.as_u16(), response.text()));
                }
                Decision::Exhausted => return Err(exhausted(&state)),
                Decision::RenewAuth => {
                    tracing::info!(
                        "{} {} returned 401 (attempt {}/{}), renewing token",
                        method,
                        url,
                        state.attempts(),
                        self.policy.max_retries
                    );
                    self.session.renew().await?;
                }
                Decision::SolveChallenge => self.recover_from_unprocessable().await?,
                Decision::Backoff(delay) => {
                    tracing::warn!(
                        "{} {} blocked by edge proxy with HTTP {} (attempt {}/{}), retrying in {:.1}s",
                        method,
                        url,
                        response.status.as_u16(),
                        state.attempts(),
                        self.policy.max_retries,
                        delay.as_secs_f64()
                    );
                    self.sleep(delay).await?;
                }
            }
        }
    }

    /// GET and decode JSON
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.execute(Method::GET, url, None).await?.json()
    }

    /// POST a JSON body and decode the JSON answer
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        self.execute(Method::POST, url, Some(body)).await?.json()
    }

    /// React to a 422. A failed solve is not an error of its own: the
    /// 422 that triggered it already used up an attempt, so the next
    /// request simply tries again.
    async fn recover_from_unprocessable(&self) -> Result<()> {
        let Some(resolver) = &self.resolver else {
            // Only reachable with the extend-session strategy
            if self.session.extend_session().await {
                return Ok(());
            }
            return Err(Error::challenge_required(self.challenge_url.clone()));
        };

        tracing::info!("Solving human-verification challenge at {}", self.challenge_url);
        let credentials = self.session.store().snapshot().await;
        let solved = self
            .cancellable(resolver.solve(&self.challenge_url, &credentials))
            .await;

        match solved {
            Ok(cookies) if !cookies.is_empty() => {
                self.session.store().apply_refreshed_cookies(&cookies).await;
                tracing::info!("Challenge solved, {} cookies refreshed", cookies.len());
                Ok(())
            }
            Ok(_) => {
                tracing::warn!("Challenge resolver returned no cookies");
                Ok(())
            }
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) => {
                tracing::warn!("Challenge resolver failed: {}", e);
                Ok(())
            }
        }
    }

    /// Send one attempt, with a single relaxed-TLS retry on transport failure
    async fn send(
        &self,
        method: &Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<UpstreamResponse> {
        match self
            .cancellable(self.send_with(&self.client, method, url, body))
            .await
        {
            Err(Error::Network(e)) if self.relax_tls_on_failure && is_transport_failure(&e) => {
                tracing::warn!(
                    "Transport failure for {} {} ({}), retrying once with certificate verification disabled",
                    method,
                    url,
                    e
                );
                let relaxed = self
                    .relaxed_client
                    .get_or_try_init(|| async { build_client(&self.api_settings, true) })
                    .await?;
                self.cancellable(self.send_with(relaxed, method, url, body))
                    .await
            }
            other => other,
        }
    }

    async fn send_with(
        &self,
        client: &Client,
        method: &Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<UpstreamResponse> {
        let credentials = self.session.store().snapshot().await;
        let mut request = client
            .request(method.clone(), url)
            .header(COOKIE, credentials.raw_cookie.as_str());
        if let Some(token) = &credentials.bearer_token {
            request = request.header(AUTHORIZATION, token.header_value());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        tracing::debug!("{} {} -> {} ({} bytes)", method, url, status.as_u16(), body.len());

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }

    async fn cancellable<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            result = fut => result,
        }
    }

    async fn sleep(&self, delay: Duration) -> Result<()> {
        self.cancellable(async {
            tokio::time::sleep(delay).await;
            Ok(())
        })
        .await
    }
}

/// Failure before any response arrived: connect, TLS, timeout or a dropped
/// connection
fn is_transport_failure(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request()
}

fn exhausted(state: &RetryState<'_>) -> Error {
    tracing::warn!(
        "Retry budget exhausted after {} attempts (last HTTP status {:?})",
        state.attempts(),
        state.last_status()
    );
    Error::RetryExhausted {
        last_status: state.last_status(),
        attempts: state.attempts(),
    }
}
