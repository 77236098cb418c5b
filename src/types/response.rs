//! Response type definitions
//!
//! Results handed back to callers: downloaded files, per-artifact reports
//! and account billing information.

use super::FileType;
use super::serde_helpers::lenient_count;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A file durably written to local storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadResult {
    pub file_type: FileType,
    pub remote_url: String,
    pub local_path: PathBuf,
}

impl DownloadResult {
    /// Create a new download result
    pub fn new(file_type: FileType, remote_url: impl Into<String>, local_path: PathBuf) -> Self {
        Self {
            file_type,
            remote_url: remote_url.into(),
            local_path,
        }
    }
}

/// Which artifact kinds to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSelection {
    pub audio: bool,
    pub video: bool,
    pub image: bool,
}

impl Default for ArtifactSelection {
    fn default() -> Self {
        Self {
            audio: true,
            video: false,
            image: false,
        }
    }
}

impl ArtifactSelection {
    /// Selection containing every artifact kind
    pub fn all() -> Self {
        Self {
            audio: true,
            video: true,
            image: true,
        }
    }

    /// Whether `file_type` is selected
    pub fn includes(&self, file_type: FileType) -> bool {
        match file_type {
            FileType::Audio => self.audio,
            FileType::Video => self.video,
            FileType::Image => self.image,
        }
    }

    /// Selected kinds, in rendering order
    pub fn file_types(&self) -> Vec<FileType> {
        FileType::ALL
            .into_iter()
            .filter(|t| self.includes(*t))
            .collect()
    }
}

/// Outcome of fetching a single artifact kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactOutcome {
    Downloaded { result: DownloadResult },
    Failed { error: String },
    Skipped,
}

/// Aggregate result of a multi-artifact fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReport {
    pub song_id: String,
    pub artifacts: BTreeMap<FileType, ArtifactOutcome>,
}

impl ArtifactReport {
    /// Empty report for a song, every kind marked skipped
    pub fn new(song_id: impl Into<String>) -> Self {
        Self {
            song_id: song_id.into(),
            artifacts: FileType::ALL
                .into_iter()
                .map(|t| (t, ArtifactOutcome::Skipped))
                .collect(),
        }
    }

    /// Record the outcome for one kind
    pub fn record(&mut self, file_type: FileType, outcome: ArtifactOutcome) {
        self.artifacts.insert(file_type, outcome);
    }

    /// Local path of a downloaded kind
    pub fn local_path(&self, file_type: FileType) -> Option<&PathBuf> {
        match self.artifacts.get(&file_type) {
            Some(ArtifactOutcome::Downloaded { result }) => Some(&result.local_path),
            _ => None,
        }
    }

    /// Whether any selected kind failed
    pub fn has_failures(&self) -> bool {
        self.artifacts
            .values()
            .any(|o| matches!(o, ArtifactOutcome::Failed { .. }))
    }
}

/// Account credit information from `GET /billing/info/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingInfo {
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_credits_left: u64,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub monthly_limit: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub monthly_usage: u64,
}
