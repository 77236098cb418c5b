//! Generated asset handling
//!
//! Waiting for artifacts to be rendered and fetching them from the CDN.

pub mod downloader;
pub mod poller;

pub use downloader::{Downloader, SongRef, default_file_name, extract_song_id};
pub use poller::{SongSource, wait_for_file};
