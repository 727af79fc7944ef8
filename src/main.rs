//! `ytpl` CLI - Add videos listed in a file to a YouTube playlist

mod cmd;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use ytpl::batch::PlaylistUnavailable;

#[derive(Parser)]
#[command(name = "ytpl")]
#[command(about = "Manage YouTube playlists from the command line")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/ytpl/config.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// OAuth client secrets file from the Google Cloud Console
    #[arg(long, global = true)]
    client_secrets: Option<PathBuf>,

    /// Where to cache the OAuth token
    #[arg(long, global = true)]
    token_cache: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add videos from a file to a YouTube playlist
    Add {
        /// File containing YouTube video URLs (one URL per line)
        #[arg(short, long, value_parser = existing_file)]
        file: PathBuf,

        /// ID of the YouTube playlist to add videos to
        #[arg(short, long)]
        playlist_id: String,
    },

    /// Authorize access to your YouTube account and cache the token
    Auth,
}

/// Input files must exist and be regular files.
fn existing_file(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if !path.exists() {
        return Err(format!("File '{value}' does not exist."));
    }
    if !path.is_file() {
        return Err(format!("File '{value}' is not a regular file."));
    }
    Ok(path)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.downcast_ref::<PlaylistUnavailable>().is_some() {
                // The cause was already printed when verification failed
                tracing::debug!("{e:#}");
            } else {
                ytpl::console::error(format!("{e:#}"));
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ytpl::load_config(cli.config.as_deref())?
        .with_overrides(cli.client_secrets, cli.token_cache);

    match cli.command {
        Commands::Add { file, playlist_id } => {
            cmd::cmd_add(&file, &playlist_id, &config).await?;
        }
        Commands::Auth => {
            cmd::cmd_auth(&config).await?;
        }
    }

    Ok(())
}
