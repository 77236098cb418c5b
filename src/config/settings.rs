//! Configuration settings structure
//!
//! Defines the settings tree for a client instance. Nothing here reads
//! process-wide state on its own: environment overrides are applied only
//! when [`Settings::merge_with_env`] is called explicitly.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration settings for a client instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Identity provider and credential configuration
    pub auth: AuthSettings,
    /// Content API configuration
    pub api: ApiSettings,
    /// Classified-retry policy
    pub retry: RetrySettings,
    /// Asset readiness polling
    pub polling: PollingSettings,
    /// Artifact downloads
    pub download: DownloadSettings,
    /// Human-verification challenge solving
    pub challenge: ChallengeSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Identity provider (Clerk) configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Raw browser cookie string, required
    pub cookie: String,
    /// Clerk frontend API base URL
    pub clerk_base_url: String,
    /// `__clerk_api_version` query parameter
    pub clerk_api_version: String,
    /// `_clerk_js_version` query parameter
    pub clerk_js_version: String,
}

/// Content API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Studio API base URL
    pub base_url: String,
    /// Static asset origin
    pub cdn_base_url: String,
    /// Per-request timeout
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
    /// Browser user agent presented upstream
    pub user_agent: String,
    /// Referer header
    pub referer: String,
}

/// How a 422 response is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnprocessableStrategy {
    /// Treat as a human-verification challenge
    #[default]
    Challenge,
    /// Try extending the session id, then retry
    ExtendSession,
}

/// Classified-retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts per logical call
    pub max_retries: u32,
    /// First backoff delay, doubled per attempt
    #[serde(with = "duration_secs")]
    pub base_delay: Duration,
    /// Upper bound of the random jitter added to each delay
    #[serde(with = "duration_secs")]
    pub max_jitter: Duration,
    /// Retry once with certificate verification disabled after a
    /// connection/TLS failure
    pub relax_tls_on_failure: bool,
    /// Reaction to 422 responses
    pub unprocessable: UnprocessableStrategy,
}

/// Asset readiness polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    /// Give up after this long
    #[serde(with = "duration_secs")]
    pub max_wait: Duration,
    /// Delay between polls
    #[serde(with = "duration_secs")]
    pub check_interval: Duration,
}

/// Artifact download configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    /// Attempts per file
    pub max_retries: u32,
    /// Fixed delay between attempts
    #[serde(with = "duration_secs")]
    pub retry_delay: Duration,
    /// Per-attempt timeout
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Destination directory
    pub output_dir: PathBuf,
    /// Fetch audio
    pub audio: bool,
    /// Fetch video
    pub video: bool,
    /// Fetch cover image
    pub image: bool,
}

/// Human-verification challenge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeSettings {
    /// Launch a browser to solve challenges
    pub enabled: bool,
    /// Protected page hosting the widget
    pub page_url: String,
    /// Origin loaded before cookies are installed
    pub origin: String,
    /// Domain the cookies are installed on
    pub cookie_domain: String,
    /// CSS selector of the widget iframe
    pub widget_selector: String,
    /// How long to look for the widget
    #[serde(with = "duration_secs")]
    pub widget_timeout: Duration,
    /// Pause after clicking before checking the widget
    #[serde(with = "duration_secs")]
    pub settle_delay: Duration,
    /// How long to wait for the widget to disappear
    #[serde(with = "duration_secs")]
    pub grace_period: Duration,
    /// Browser user agent
    pub user_agent: String,
    /// Explicit Chrome/Chromium binary
    pub chrome_executable: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level
    pub level: String,
    /// Enable verbose logging
    pub verbose: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            cookie: String::new(),
            clerk_base_url: "https://clerk.suno.com/v1".to_string(),
            clerk_api_version: "2021-02-05".to_string(),
            clerk_js_version: "5.35.1".to_string(),
        }
    }
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("cookie", &crate::types::internal::fingerprint(&self.cookie))
            .field("clerk_base_url", &self.clerk_base_url)
            .field("clerk_api_version", &self.clerk_api_version)
            .field("clerk_js_version", &self.clerk_js_version)
            .finish()
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://studio-api.prod.suno.com/api".to_string(),
            cdn_base_url: "https://cdn1.suno.ai".to_string(),
            request_timeout: Duration::from_secs(30),
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
            referer: "https://suno.com/".to_string(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(3),
            max_jitter: Duration::from_secs(1),
            relax_tls_on_failure: true,
            unprocessable: UnprocessableStrategy::Challenge,
        }
    }
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(300),
            check_interval: Duration::from_secs(5),
        }
    }
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            max_retries: 10,
            retry_delay: Duration::from_secs(10),
            timeout: Duration::from_secs(60),
            output_dir: PathBuf::from("."),
            audio: true,
            video: false,
            image: false,
        }
    }
}

impl Default for ChallengeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            page_url: "https://suno.com/create".to_string(),
            origin: "https://suno.com".to_string(),
            cookie_domain: ".suno.com".to_string(),
            widget_selector: r#"iframe[src*="hcaptcha.com"]"#.to_string(),
            widget_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_secs(10),
            grace_period: Duration::from_secs(30),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            chrome_executable: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            verbose: false,
        }
    }
}

impl Settings {
    /// Create default settings with the given cookie
    pub fn new(cookie: impl Into<String>) -> Self {
        let mut settings = Self::default();
        settings.auth.cookie = cookie.into();
        settings
    }

    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| Error::config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Apply environment variable overrides
    pub fn merge_with_env(mut self) -> Result<Self> {
        if let Ok(cookie) = std::env::var("SUNO_COOKIE")
            && !cookie.trim().is_empty()
        {
            self.auth.cookie = cookie;
        }

        if let Ok(url) = std::env::var("SUNO_API_URL") {
            self.api.base_url = url;
        }

        if let Ok(retries) = std::env::var("SUNO_MAX_RETRIES") {
            self.retry.max_retries = retries
                .parse()
                .map_err(|e| Error::config(format!("Invalid SUNO_MAX_RETRIES: {}", e)))?;
        }

        if let Ok(secs) = std::env::var("SUNO_MAX_WAIT") {
            self.polling.max_wait = parse_secs("SUNO_MAX_WAIT", &secs)?;
        }

        if let Ok(secs) = std::env::var("SUNO_CHECK_INTERVAL") {
            self.polling.check_interval = parse_secs("SUNO_CHECK_INTERVAL", &secs)?;
        }

        if let Ok(dir) = std::env::var("SUNO_OUTPUT_DIR") {
            self.download.output_dir = PathBuf::from(dir);
        }

        Ok(self)
    }

    /// Check that the settings describe a usable client
    pub fn validate(&self) -> Result<()> {
        if self.auth.cookie.trim().is_empty() {
            return Err(Error::config(
                "A Suno cookie is required (config file, SUNO_COOKIE or --cookie)",
            ));
        }

        for (name, value) in [
            ("auth.clerk_base_url", &self.auth.clerk_base_url),
            ("api.base_url", &self.api.base_url),
            ("api.cdn_base_url", &self.api.cdn_base_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| Error::config(format!("Invalid {} '{}': {}", name, value, e)))?;
        }

        if self.retry.max_retries == 0 {
            return Err(Error::config("retry.max_retries must be at least 1"));
        }

        if self.download.max_retries == 0 {
            return Err(Error::config("download.max_retries must be at least 1"));
        }

        if self.polling.check_interval.is_zero() {
            return Err(Error::config("polling.check_interval must be positive"));
        }

        Ok(())
    }

    /// Artifact kinds selected for download
    pub fn artifact_selection(&self) -> crate::types::ArtifactSelection {
        crate::types::ArtifactSelection {
            audio: self.download.audio,
            video: self.download.video,
            image: self.download.image,
        }
    }
}

fn parse_secs(name: &str, raw: &str) -> Result<Duration> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|e| Error::config(format!("Invalid {}: {}", name, e)))?;
    Duration::try_from_secs_f64(secs)
        .map_err(|e| Error::config(format!("Invalid {}: {}", name, e)))
}

/// Durations as (fractional) seconds in config files
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer, de};
    use std::time::Duration;

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(de::Error::custom)
    }
}
