//! `suno` command-line client
//!
//! ```bash
//! suno --cookie "$SUNO_COOKIE" generate "a calm lo-fi track about rain"
//! suno download 0f6c3a9e-3c43-4c1b-9a1e-1d2f3a4b5c6d --type audio -o songs/
//! ```

use clap::Parser;
use suno_client::cli::{Cli, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run(Cli::parse()).await
}
