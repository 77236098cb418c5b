//! Artifact downloader
//!
//! CDN URLs are deterministic per song id and unauthenticated, so downloads
//! use a plain HTTP client and never touch the credential store. Bytes are
//! streamed to a `.part` file that is renamed into place only once the body
//! has been fully written.

use crate::{
    Error, Result,
    config::Settings,
    types::{DownloadResult, FileType, Song},
};
use futures::StreamExt;
use regex::Regex;
use reqwest::Client;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

static SONG_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-fA-F0-9-]{36}").expect("song id pattern is valid"));

/// A song given either by value or by something containing its id
#[derive(Debug, Clone, Copy)]
pub enum SongRef<'a> {
    /// Bare id, or any text containing one (e.g. a share URL)
    Id(&'a str),
    /// Already materialized song
    Song(&'a Song),
}

impl SongRef<'_> {
    /// Resolve the song id
    pub fn id(&self) -> Result<String> {
        match self {
            Self::Song(song) => Ok(song.id.clone()),
            Self::Id(raw) => extract_song_id(raw),
        }
    }
}

impl<'a> From<&'a str> for SongRef<'a> {
    fn from(raw: &'a str) -> Self {
        Self::Id(raw)
    }
}

impl<'a> From<&'a String> for SongRef<'a> {
    fn from(raw: &'a String) -> Self {
        Self::Id(raw.as_str())
    }
}

impl<'a> From<&'a Song> for SongRef<'a> {
    fn from(song: &'a Song) -> Self {
        Self::Song(song)
    }
}

/// Find the first UUID-shaped song id in `raw`
pub fn extract_song_id(raw: &str) -> Result<String> {
    SONG_ID_REGEX
        .find(raw)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::InvalidSongId(raw.to_string()))
}

/// Default file name of an artifact: `{type}_{id}.{ext}`
pub fn default_file_name(file_type: FileType, song_id: &str) -> String {
    format!("{}_{}.{}", file_type, song_id, file_type.extension())
}

/// Downloads artifacts from the CDN with bounded retries
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    cdn_base_url: String,
    max_retries: u32,
    retry_delay: Duration,
    cancel: CancellationToken,
}

impl Downloader {
    /// Create a downloader from settings
    pub fn new(settings: &Settings, cancel: CancellationToken) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.api.user_agent.as_str())
            .timeout(settings.download.timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            cdn_base_url: settings.api.cdn_base_url.clone(),
            max_retries: settings.download.max_retries.max(1),
            retry_delay: settings.download.retry_delay,
            cancel,
        })
    }

    /// Download one artifact into `root`.
    ///
    /// `name` overrides the generated file name. Non-2xx responses and
    /// transport failures are retried with a fixed delay.
    pub async fn download<'a>(
        &self,
        song: impl Into<SongRef<'a>>,
        file_type: FileType,
        root: &Path,
        name: Option<&str>,
    ) -> Result<DownloadResult> {
        let song_id = song.into().id()?;
        let url = file_type.cdn_url(&self.cdn_base_url, &song_id);
        let file_name = match name {
            Some(name) => checked_file_name(name)?,
            None => default_file_name(file_type, &song_id),
        };
        let destination = root.join(&file_name);

        tokio::fs::create_dir_all(root).await?;

        let mut last_error = String::new();
        for attempt in 1..=self.max_retries {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            match self.fetch_to(&url, &destination).await {
                Ok(()) => {
                    tracing::info!("Downloaded {}: {}", file_type, destination.display());
                    return Ok(DownloadResult::new(file_type, url, destination));
                }
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    tracing::warn!(
                        "Error downloading {}: {}. Retrying {}/{}...",
                        file_type,
                        e,
                        attempt,
                        self.max_retries
                    );
                    last_error = e.to_string();
                }
            }

            if attempt < self.max_retries {
                tokio::select! {
                    _ = self.cancel.cancelled() => return Err(Error::Cancelled),
                    _ = tokio::time::sleep(self.retry_delay) => {}
                }
            }
        }

        Err(Error::DownloadExhausted {
            file_type,
            url,
            attempts: self.max_retries,
            last_error,
        })
    }

    /// One attempt: stream into a sibling `.part` file, then rename
    async fn fetch_to(&self, url: &str, destination: &Path) -> Result<()> {
        let partial = partial_path(destination);
        let result = tokio::select! {
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            result = self.stream_to(url, &partial) => result,
        };

        match result {
            Ok(()) => {
                tokio::fs::rename(&partial, destination).await?;
                Ok(())
            }
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&partial).await
                    && cleanup.kind() != std::io::ErrorKind::NotFound
                {
                    tracing::debug!("Could not remove {}: {}", partial.display(), cleanup);
                }
                Err(e)
            }
        }
    }

    async fn stream_to(&self, url: &str, partial: &Path) -> Result<()> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::upstream(
                status.as_u16(),
                response.text().await.unwrap_or_default(),
            ));
        }

        let mut file = tokio::fs::File::create(partial).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0usize;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += chunk.len();
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        file.sync_all().await?;
        tracing::debug!("Fetched {} bytes from {}", written, url);
        Ok(())
    }
}

/// A caller-supplied name must be a single plain path component, so the
/// file always lands directly inside the destination root
fn checked_file_name(name: &str) -> Result<String> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name.to_string()),
        _ => Err(Error::config(format!(
            "Invalid file name '{}': expected a plain file name without directories",
            name
        ))),
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}
