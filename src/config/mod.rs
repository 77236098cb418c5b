//! Configuration management for the Suno client
//!
//! This module handles loading and managing configuration settings for a
//! client instance and the command-line tool.

pub mod loader;
pub mod settings;

pub use loader::ConfigLoader;
pub use settings::{
    ApiSettings, AuthSettings, ChallengeSettings, DownloadSettings, LoggingSettings,
    PollingSettings, RetrySettings, Settings, UnprocessableStrategy,
};
