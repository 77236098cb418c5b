//! Asset readiness polling
//!
//! Generated artifacts appear asynchronously, one modality at a time, and
//! upstream offers no push signal. [`wait_for_file`] re-fetches the song
//! until the requested artifact URL is populated or the wait budget is
//! spent.

use crate::{
    Error, Result,
    types::{FileType, Song},
};
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Anything that can fetch a song by id
#[async_trait]
pub trait SongSource: Send + Sync {
    async fn fetch_song(&self, id: &str) -> Result<Song>;
}

/// Poll `source` until `file_type` is available for song `id`.
///
/// Elapsed time advances by `interval` per unsuccessful poll, so a budget of
/// `max_wait` allows `ceil(max_wait / interval)` polls. Fetch errors are
/// terminal; transient upstream failures are already absorbed below.
pub async fn wait_for_file<S>(
    source: &S,
    id: &str,
    file_type: FileType,
    max_wait: Duration,
    interval: Duration,
    cancel: &CancellationToken,
) -> Result<Song>
where
    S: SongSource + ?Sized,
{
    let mut elapsed = Duration::ZERO;
    let mut polls = 0u32;

    while elapsed < max_wait {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let song = source.fetch_song(id).await?;
        polls += 1;
        if song.is_ready(file_type) {
            tracing::info!("{} for song {} ready after {} polls", file_type, id, polls);
            return Ok(song);
        }

        tracing::debug!(
            "{} for song {} not ready yet (status {:?}), next check in {:?}",
            file_type,
            id,
            song.status,
            interval
        );

        tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            _ = tokio::time::sleep(interval) => {}
        }
        elapsed += interval;
    }

    tracing::warn!("{} for song {} not ready after {:?}", file_type, id, elapsed);
    Err(Error::Timeout {
        file_type,
        id: id.to_string(),
        waited: elapsed,
    })
}
