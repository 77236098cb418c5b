//! # Suno client
//!
//! [`SunoClient`] is the collaborator-facing surface: generation, feed
//! lookups, readiness polling and downloads. Every content API call goes
//! through the resilient [`RequestExecutor`]; CDN downloads use a separate
//! unauthenticated client.
//!
//! One client owns one credential set. Calls on a client are serialized
//! internally; use separate clients for separate accounts.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use suno_client::{SunoClient, config::Settings, types::{FileType, GenerationRequest}};
//!
//! # tokio_test::block_on(async {
//! let client = SunoClient::new(Settings::new(std::env::var("SUNO_COOKIE")?))?;
//!
//! let songs = client
//!     .generate(&GenerationRequest::new("a calm lo-fi track about rain"))
//!     .await?;
//! let first = &songs[0];
//! let ready = client
//!     .wait_for_file(&first.id, FileType::Audio, None, None)
//!     .await?;
//! let saved = client
//!     .download(&ready, FileType::Audio, std::path::Path::new("."), None)
//!     .await?;
//! println!("saved to {}", saved.local_path.display());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

use crate::{
    Error, Result,
    assets::{Downloader, SongRef, SongSource, wait_for_file},
    challenge::ChallengeResolver,
    config::{PollingSettings, Settings},
    session::{CredentialStore, SessionManager},
    transport::{RequestExecutor, build_client},
    types::{
        ArtifactOutcome, ArtifactReport, ArtifactSelection, BillingInfo, DownloadResult, FileType,
        GenerationRequest, Song, request::is_known_model,
    },
};
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    clips: Vec<Song>,
}

/// Resilient, authenticated Suno client
#[derive(Debug)]
pub struct SunoClient {
    settings: Settings,
    session: Arc<SessionManager>,
    executor: RequestExecutor,
    downloader: Downloader,
    cancel: CancellationToken,
}

/// Builder for [`SunoClient`]
#[derive(Debug)]
pub struct SunoClientBuilder {
    settings: Settings,
    resolver: Option<Arc<dyn ChallengeResolver>>,
    cancel: Option<CancellationToken>,
}

impl SunoClientBuilder {
    /// Use a custom challenge resolver
    pub fn challenge_resolver(mut self, resolver: Arc<dyn ChallengeResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Share a cancellation token with the caller
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Validate settings and assemble the client
    pub fn build(self) -> Result<SunoClient> {
        let settings = self.settings;
        settings.validate()?;

        let cancel = self.cancel.unwrap_or_default();
        let http_client = build_client(&settings.api, false)?;
        let store = Arc::new(CredentialStore::new(settings.auth.cookie.clone()));
        let session = Arc::new(SessionManager::new(&settings, http_client.clone(), store));

        let mut executor =
            RequestExecutor::new(&settings, http_client, session.clone(), cancel.clone());
        if let Some(resolver) = self.resolver.or_else(|| default_resolver(&settings)) {
            executor = executor.with_resolver(resolver);
        }

        let downloader = Downloader::new(&settings, cancel.clone())?;

        tracing::debug!(
            "Client ready (api {}, challenge resolver: {})",
            settings.api.base_url,
            executor.has_resolver()
        );

        Ok(SunoClient {
            settings,
            session,
            executor,
            downloader,
            cancel,
        })
    }
}

#[cfg(feature = "browser")]
fn default_resolver(settings: &Settings) -> Option<Arc<dyn ChallengeResolver>> {
    settings.challenge.enabled.then(|| {
        Arc::new(crate::challenge::BrowserChallengeResolver::new(
            settings.challenge.clone(),
        )) as Arc<dyn ChallengeResolver>
    })
}

#[cfg(not(feature = "browser"))]
fn default_resolver(settings: &Settings) -> Option<Arc<dyn ChallengeResolver>> {
    if settings.challenge.enabled {
        tracing::warn!("Challenge solving requested but the browser feature is disabled");
    }
    None
}

impl SunoClient {
    /// Create a client with the default resolver selection
    pub fn new(settings: Settings) -> Result<Self> {
        Self::builder(settings).build()
    }

    /// Start building a client
    pub fn builder(settings: Settings) -> SunoClientBuilder {
        SunoClientBuilder {
            settings,
            resolver: None,
            cancel: None,
        }
    }

    /// Settings the client was built with
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Session manager owning this client's credentials
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Generate songs; upstream usually returns two clips per request
    pub async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Song>> {
        if !is_known_model(&request.model) {
            tracing::warn!("Model '{}' is not in the known model list, sending as-is", request.model);
        }

        self.session.ensure_session().await?;
        let token = self.session.mint_token().await?;
        let payload = serde_json::to_value(request.to_payload(token.as_str()))?;

        tracing::info!(
            "Generating with model {} ({} mode)",
            request.model,
            if request.custom { "custom" } else { "description" }
        );
        let response: GenerateResponse = self
            .executor
            .post_json(&self.api_url("/generate/v2/")?, &payload)
            .await?;

        if response.clips.len() < 2 {
            tracing::warn!("Expected at least 2 clips, upstream returned {}", response.clips.len());
        }
        tracing::info!(
            "Generation submitted: {}",
            response
                .clips
                .iter()
                .map(|s| s.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(response.clips)
    }

    /// Fetch one song from the feed
    pub async fn get_song(&self, id: &str) -> Result<Song> {
        let id = id.trim();
        if id.is_empty() {
            return Err(Error::InvalidSongId(id.to_string()));
        }

        let mut url = Url::parse(&self.api_url("/feed/")?)
            .map_err(|e| Error::config(format!("Invalid API URL: {}", e)))?;
        url.query_pairs_mut().append_pair("ids", id);

        tracing::debug!("Fetching song {}", id);
        let songs: Vec<Song> = self.executor.get_json(url.as_str()).await?;
        songs
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidSongId(id.to_string()))
    }

    /// Fetch every song visible to the session
    pub async fn get_songs(&self) -> Result<Vec<Song>> {
        self.executor.get_json(&self.api_url("/feed")?).await
    }

    /// Account credit information
    pub async fn get_credits(&self) -> Result<BillingInfo> {
        self.executor.get_json(&self.api_url("/billing/info/")?).await
    }

    /// Poll until `file_type` is available. `None` falls back to the
    /// configured polling settings.
    pub async fn wait_for_file(
        &self,
        id: &str,
        file_type: FileType,
        max_wait: Option<Duration>,
        interval: Option<Duration>,
    ) -> Result<Song> {
        wait_for_file(
            self,
            id,
            file_type,
            max_wait.unwrap_or(self.settings.polling.max_wait),
            interval.unwrap_or(self.settings.polling.check_interval),
            &self.cancel,
        )
        .await
    }

    /// Download one artifact into `root`
    pub async fn download<'a>(
        &self,
        song: impl Into<SongRef<'a>>,
        file_type: FileType,
        root: &Path,
        name: Option<&str>,
    ) -> Result<DownloadResult> {
        self.downloader.download(song, file_type, root, name).await
    }

    /// Wait for and download every selected artifact as `root/{id}.{ext}`.
    ///
    /// Each type succeeds or fails on its own; only cancellation aborts
    /// the whole operation.
    pub async fn fetch_artifacts(
        &self,
        id: &str,
        selection: ArtifactSelection,
        polling: &PollingSettings,
        root: &Path,
    ) -> Result<ArtifactReport> {
        let mut report = ArtifactReport::new(id);

        for file_type in selection.file_types() {
            let outcome = match self.fetch_one(id, file_type, polling, root).await {
                Ok(result) => ArtifactOutcome::Downloaded { result },
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    tracing::error!("Failed to fetch {} for song {}: {}", file_type, id, e);
                    ArtifactOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            report.record(file_type, outcome);
        }

        Ok(report)
    }

    async fn fetch_one(
        &self,
        id: &str,
        file_type: FileType,
        polling: &PollingSettings,
        root: &Path,
    ) -> Result<DownloadResult> {
        let song = wait_for_file(
            self,
            id,
            file_type,
            polling.max_wait,
            polling.check_interval,
            &self.cancel,
        )
        .await?;
        let name = format!("{}.{}", song.id, file_type.extension());
        self.downloader
            .download(&song, file_type, root, Some(&name))
            .await
    }

    /// Best-effort identity keepalive
    pub async fn touch_session(&self) -> bool {
        self.session.touch_session().await
    }

    /// Best-effort session id extension
    pub async fn extend_session(&self) -> bool {
        self.session.extend_session().await
    }

    /// Abort in-flight and future operations of this client
    pub fn cancel(&self) {
        tracing::info!("Client cancelled");
        self.cancel.cancel();
    }

    /// Token observed by every retry and poll loop of this client
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Raw executor access for endpoints without a dedicated method
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<crate::transport::UpstreamResponse> {
        self.executor.execute(method, &self.api_url(path)?, body).await
    }

    fn api_url(&self, path: &str) -> Result<String> {
        if !path.starts_with('/') {
            return Err(Error::internal(format!("API path must be absolute: {}", path)));
        }
        Ok(format!(
            "{}{}",
            self.settings.api.base_url.trim_end_matches('/'),
            path
        ))
    }
}

#[async_trait]
impl SongSource for SunoClient {
    async fn fetch_song(&self, id: &str) -> Result<Song> {
        self.get_song(id).await
    }
}
