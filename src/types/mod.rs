//! Type definitions for the Suno client
//!
//! This module contains the data structures exchanged with upstream and
//! handed back to callers.

pub mod internal;
pub mod request;
pub mod response;
pub mod serde_helpers;
pub mod song;

pub use internal::{BearerToken, Credentials};
pub use request::{DEFAULT_MODEL, GeneratePayload, GenerationRequest, KNOWN_MODELS};
pub use response::{
    ArtifactOutcome, ArtifactReport, ArtifactSelection, BillingInfo, DownloadResult,
};
pub use song::{FileType, Song, SongMetadata, SongStatus};
