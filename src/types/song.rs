//! Song and artifact type definitions
//!
//! A [`Song`] is materialized from upstream JSON exactly once and never
//! mutated afterwards; polling produces fresh values. Deserialization always
//! goes through [`SongRecord`] so the cover image normalization cannot be
//! skipped.

use super::serde_helpers::{
    empty_string_as_none, lenient_count, lenient_timestamp, null_as_empty_string, null_as_false,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of generated artifact attached to a song
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Audio,
    Video,
    Image,
}

impl FileType {
    /// All artifact kinds, in the order they are usually rendered upstream
    pub const ALL: [FileType; 3] = [FileType::Audio, FileType::Video, FileType::Image];

    /// Lowercase name used in URLs, file names and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Image => "image",
        }
    }

    /// File extension of the CDN asset
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Audio => "mp3",
            Self::Video => "mp4",
            Self::Image => "jpeg",
        }
    }

    /// Deterministic CDN URL of this artifact for a song id
    pub fn cdn_url(&self, cdn_base: &str, song_id: &str) -> String {
        let base = cdn_base.trim_end_matches('/');
        match self {
            Self::Audio | Self::Video => format!("{}/{}.{}", base, song_id, self.extension()),
            Self::Image => format!("{}/image_large_{}.{}", base, song_id, self.extension()),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "audio" | "mp3" => Ok(Self::Audio),
            "video" | "mp4" => Ok(Self::Video),
            "image" | "cover" | "jpeg" | "jpg" => Ok(Self::Image),
            other => Err(crate::Error::config(format!(
                "Unknown file type '{}', expected audio, video or image",
                other
            ))),
        }
    }
}

/// Rendering status reported by the feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SongStatus {
    Submitted,
    Queued,
    Streaming,
    Complete,
    Error,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Free-form generation metadata; well-known keys are typed, the rest kept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SongMetadata {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub tags: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub prompt: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub gpt_description_prompt: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub error_message: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A generated song as exposed to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SongRecord")]
pub struct Song {
    pub id: String,
    pub status: SongStatus,
    pub title: String,
    pub audio_url: Option<String>,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
    pub image_large_url: Option<String>,
    /// Always mirrors `image_large_url`
    pub cover_image_url: Option<String>,
    pub model_name: String,
    pub major_model_version: String,
    pub metadata: SongMetadata,
    pub created_at: Option<DateTime<Utc>>,
    pub play_count: u64,
    pub upvote_count: u64,
    pub is_public: bool,
    pub is_liked: bool,
    pub is_trashed: bool,
    pub user_id: String,
    pub reaction: Option<serde_json::Value>,
}

impl Song {
    /// URL of the requested artifact, if upstream has rendered it
    pub fn artifact_url(&self, file_type: FileType) -> Option<&str> {
        match file_type {
            FileType::Audio => self.audio_url.as_deref(),
            FileType::Video => self.video_url.as_deref(),
            FileType::Image => self.cover_image_url.as_deref(),
        }
    }

    /// Whether the requested artifact is available
    pub fn is_ready(&self, file_type: FileType) -> bool {
        self.artifact_url(file_type).is_some()
    }
}

/// Wire shape of a feed entry / generated clip
#[derive(Debug, Clone, Deserialize)]
pub struct SongRecord {
    pub id: String,
    #[serde(default)]
    pub status: SongStatus,
    #[serde(default, deserialize_with = "null_as_empty_string")]
    pub title: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub audio_url: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub video_url: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub image_large_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty_string")]
    pub model_name: String,
    #[serde(default, deserialize_with = "null_as_empty_string")]
    pub major_model_version: String,
    #[serde(default)]
    pub metadata: Option<SongMetadata>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub play_count: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub upvote_count: u64,
    #[serde(default, deserialize_with = "null_as_false")]
    pub is_public: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub is_liked: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub is_trashed: bool,
    #[serde(default, deserialize_with = "null_as_empty_string")]
    pub user_id: String,
    #[serde(default)]
    pub reaction: Option<serde_json::Value>,
}

impl From<SongRecord> for Song {
    fn from(record: SongRecord) -> Self {
        Self {
            cover_image_url: record.image_large_url.clone(),
            id: record.id,
            status: record.status,
            title: record.title,
            audio_url: record.audio_url,
            video_url: record.video_url,
            image_url: record.image_url,
            image_large_url: record.image_large_url,
            model_name: record.model_name,
            major_model_version: record.major_model_version,
            metadata: record.metadata.unwrap_or_default(),
            created_at: record.created_at,
            play_count: record.play_count,
            upvote_count: record.upvote_count,
            is_public: record.is_public,
            is_liked: record.is_liked,
            is_trashed: record.is_trashed,
            user_id: record.user_id,
            reaction: record.reaction,
        }
    }
}
