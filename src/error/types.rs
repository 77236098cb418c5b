//! Error type definitions
//!
//! Transient upstream conditions (expired tokens, edge-proxy blocks, flaky
//! connections) are absorbed by the request executor. Only terminal
//! outcomes show up here, each carrying enough context to act on.

use crate::types::FileType;
use thiserror::Error;

/// Upstream bodies attached to errors are cut at this many bytes.
const MAX_BODY_LEN: usize = 512;

/// Main error type for the Suno client
#[derive(Error, Debug)]
pub enum Error {
    /// Session identifier or bearer token acquisition failed
    #[error("Authentication failed during {stage}{}", fmt_status(.status))]
    Auth { stage: String, status: Option<u16> },

    /// Upstream demands human verification and no resolver is configured
    #[error("Human verification required for {url}; solve it in a browser or enable a challenge resolver")]
    ChallengeRequired { url: String },

    /// The configured challenge resolver failed
    #[error("Challenge resolution failed: {stage}")]
    Challenge { stage: String },

    /// Unexpected non-2xx response, surfaced as-is
    #[error("Upstream returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Classified-retry budget exhausted
    #[error("Gave up after {attempts} attempts{}", fmt_status(.last_status))]
    RetryExhausted {
        last_status: Option<u16>,
        attempts: u32,
    },

    /// Requested artifact never became available
    #[error("{file_type} for song {id} not ready after {waited:?}")]
    Timeout {
        file_type: FileType,
        id: String,
        waited: std::time::Duration,
    },

    /// File retrieval failed after bounded retries
    #[error("Failed to download {file_type} from {url} after {attempts} attempts: {last_error}")]
    DownloadExhausted {
        file_type: FileType,
        url: String,
        attempts: u32,
        last_error: String,
    },

    /// Input could not be resolved to a song identifier
    #[error("Invalid song id: {0}")]
    InvalidSongId(String),

    /// Operation aborted through the client's cancellation token
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network/HTTP client errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

fn fmt_status(status: &Option<u16>) -> String {
    status
        .map(|s| format!(" (last HTTP status {})", s))
        .unwrap_or_default()
}

impl Error {
    /// Create an authentication error for the given stage
    pub fn auth(stage: impl Into<String>, status: Option<u16>) -> Self {
        Self::Auth {
            stage: stage.into(),
            status,
        }
    }

    /// Create a challenge-required error
    pub fn challenge_required(url: impl Into<String>) -> Self {
        Self::ChallengeRequired { url: url.into() }
    }

    /// Create a challenge resolver error
    pub fn challenge(stage: impl Into<String>) -> Self {
        Self::Challenge {
            stage: stage.into(),
        }
    }

    /// Create an upstream error, truncating oversized bodies
    pub fn upstream(status: u16, body: impl AsRef<str>) -> Self {
        Self::Upstream {
            status,
            body: truncate_body(body.as_ref()),
        }
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Last HTTP status associated with the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } => *status,
            Self::Upstream { status, .. } => Some(*status),
            Self::RetryExhausted { last_status, .. } => *last_status,
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether a caller may reasonably retry the same call later without
    /// changing credentials or configuration
    pub fn is_retryable_by_caller(&self) -> bool {
        matches!(
            self,
            Self::RetryExhausted { .. }
                | Self::Timeout { .. }
                | Self::DownloadExhausted { .. }
                | Self::Network(_)
        )
    }
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_BODY_LEN {
        return body.to_string();
    }
    let mut end = MAX_BODY_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}
