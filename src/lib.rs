//! Suno Client - Rust Implementation
//!
//! A resilient, authenticated client for the Suno music generation service.
//! Upstream has no stable public API: session tokens expire within minutes,
//! requests are periodically blocked by bot detection, and generated assets
//! appear asynchronously. This crate turns that surface into a small set of
//! well-defined outcomes.
//!
//! # Architecture
//!
//! - [`session`]: cookie → session id → bearer token derivation (Clerk)
//! - [`transport`]: classified-retry request executor
//! - [`challenge`]: human-verification solving via a real browser
//! - [`assets`]: readiness polling and CDN downloads
//! - [`client`]: the [`SunoClient`] façade tying them together
//!
//! # Usage
//!
//! ```bash
//! suno --cookie "$SUNO_COOKIE" generate "dreamy synthwave about night drives"
//! suno fetch 0f6c3a9e-3c43-4c1b-9a1e-1d2f3a4b5c6d --audio --image -o songs/
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use suno_client::{Settings, SunoClient};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = SunoClient::new(Settings::new("__client=..."))?;
//! let credits = client.get_credits().await?;
//! println!("{} credits left", credits.total_credits_left);
//! # Ok(())
//! # }
//! ```

pub mod assets;
pub mod challenge;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod transport;
pub mod types;
pub mod utils;

pub use client::{SunoClient, SunoClientBuilder};
pub use config::Settings;
pub use error::{Error, Result};
pub use session::SessionManager;
pub use types::{DownloadResult, FileType, GenerationRequest, Song};
