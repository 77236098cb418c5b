//! Subcommand execution

use super::{Cli, Command, GenerateArgs, logging};
use crate::{
    SunoClient,
    assets::extract_song_id,
    config::{ConfigLoader, Settings},
    types::{ArtifactSelection, GenerationRequest},
    utils::version,
};
use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::time::Duration;

/// Resolve settings from file, environment and flags, then run the command
pub async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli)?;
    logging::init(&settings.logging)?;
    tracing::debug!("suno {} starting with {:?}", version::get_version(), settings);

    let client = SunoClient::new(settings)?;
    execute(&client, cli.command).await
}

/// Apply CLI flags on top of the loaded configuration
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = ConfigLoader::new()
        .load(cli.config.as_deref())
        .context("Failed to load configuration")?;

    if let Some(cookie) = &cli.cookie {
        settings.auth.cookie = cookie.clone();
    }
    if let Some(url) = &cli.api_url {
        settings.api.base_url = url.clone();
    }
    if cli.verbose {
        settings.logging.verbose = true;
    }
    if cli.solve_challenges {
        settings.challenge.enabled = true;
    }

    Ok(settings)
}

async fn execute(client: &SunoClient, command: Command) -> Result<()> {
    match command {
        Command::Generate(args) => print_json(&client.generate(&generation_request(args)).await?),
        Command::Song { id } => print_json(&client.get_song(&extract_song_id(&id)?).await?),
        Command::Songs => print_json(&client.get_songs().await?),
        Command::Credits => print_json(&client.get_credits().await?),
        Command::Wait {
            id,
            file_type,
            max_wait,
            interval,
        } => {
            let song = client
                .wait_for_file(
                    &extract_song_id(&id)?,
                    file_type,
                    max_wait.map(secs).transpose()?,
                    interval.map(secs).transpose()?,
                )
                .await?;
            print_json(&song)
        }
        Command::Download {
            id,
            file_type,
            name,
            output,
            no_wait,
        } => {
            let root = output.unwrap_or_else(|| client.settings().download.output_dir.clone());
            let result = if no_wait {
                client
                    .download(id.as_str(), file_type, &root, name.as_deref())
                    .await?
            } else {
                let song = client
                    .wait_for_file(&extract_song_id(&id)?, file_type, None, None)
                    .await?;
                client
                    .download(&song, file_type, &root, name.as_deref())
                    .await?
            };
            print_json(&result)
        }
        Command::Fetch {
            id,
            audio,
            video,
            image,
            output,
        } => {
            let selection = if audio || video || image {
                ArtifactSelection { audio, video, image }
            } else {
                client.settings().artifact_selection()
            };
            let root = output.unwrap_or_else(|| client.settings().download.output_dir.clone());
            let report = client
                .fetch_artifacts(
                    &extract_song_id(&id)?,
                    selection,
                    &client.settings().polling,
                    &root,
                )
                .await?;
            print_json(&report)?;
            if report.has_failures() {
                bail!("Some artifacts of song {} could not be fetched", report.song_id);
            }
            Ok(())
        }
    }
}

fn generation_request(args: GenerateArgs) -> GenerationRequest {
    let mut request = GenerationRequest::new(args.prompt)
        .with_custom(args.custom)
        .with_tags(args.tags)
        .with_negative_tags(args.negative_tags)
        .with_instrumental(args.instrumental)
        .with_model(args.model);
    if let Some(title) = args.title {
        request = request.with_title(title);
    }
    request
}

fn secs(value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).with_context(|| format!("Invalid duration: {}", value))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
