//! Command-line interface
//!
//! Argument definitions for the `suno` binary plus the logic that turns
//! them into client calls. Results go to stdout as JSON; logs go to stderr.

pub mod commands;
pub mod logging;

use crate::types::{DEFAULT_MODEL, FileType};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub use commands::run;

/// Resilient command-line client for Suno
#[derive(Debug, Parser)]
#[command(name = "suno", author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Browser cookie string (overrides SUNO_COOKIE)
    #[arg(long, global = true, value_name = "COOKIE")]
    pub cookie: Option<String>,

    /// Studio API base URL
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Launch a browser to solve human-verification challenges
    #[arg(long, global = true)]
    pub solve_challenges: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate songs from a description or custom lyrics
    Generate(GenerateArgs),

    /// Show one song
    Song {
        /// Song id or URL containing it
        id: String,
    },

    /// List songs visible to the session
    Songs,

    /// Show remaining credits
    Credits,

    /// Wait until an artifact is ready
    Wait {
        /// Song id
        id: String,

        /// Artifact type: audio, video or image
        #[arg(long = "type", value_name = "TYPE", default_value = "audio")]
        file_type: FileType,

        /// Give up after this many seconds
        #[arg(long, value_name = "SECS")]
        max_wait: Option<f64>,

        /// Seconds between polls
        #[arg(long, value_name = "SECS")]
        interval: Option<f64>,
    },

    /// Download one artifact
    Download {
        /// Song id or URL containing it
        id: String,

        /// Artifact type: audio, video or image
        #[arg(long = "type", value_name = "TYPE", default_value = "audio")]
        file_type: FileType,

        /// File name inside the output directory
        #[arg(long)]
        name: Option<String>,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Download immediately without waiting for readiness
        #[arg(long)]
        no_wait: bool,
    },

    /// Wait for and download several artifacts of one song
    Fetch {
        /// Song id
        id: String,

        /// Fetch audio
        #[arg(long)]
        audio: bool,

        /// Fetch video
        #[arg(long)]
        video: bool,

        /// Fetch cover image
        #[arg(long)]
        image: bool,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Description, or lyrics with --custom
    pub prompt: String,

    /// Treat the prompt as lyrics and honour --title/--tags
    #[arg(long)]
    pub custom: bool,

    /// Style tags
    #[arg(long, default_value = "")]
    pub tags: String,

    /// Styles to avoid
    #[arg(long, default_value = "")]
    pub negative_tags: String,

    /// No vocals
    #[arg(long)]
    pub instrumental: bool,

    /// Song title (custom mode)
    #[arg(long)]
    pub title: Option<String>,

    /// Model version
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,
}
