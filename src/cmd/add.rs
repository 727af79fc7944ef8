use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use ytpl::batch::run_add;
use ytpl::{Config, OAuthCredentials, PlaylistGateway, RetryPolicy, YouTubeClient};

pub async fn cmd_add(file: &Path, playlist_id: &str, config: &Config) -> Result<()> {
    info!(
        "Starting to add videos from '{}' to playlist '{playlist_id}'.",
        file.display()
    );

    let credentials = OAuthCredentials::authenticate(&config.auth)
        .await
        .context("Failed to authenticate with YouTube API")?;
    info!("Successfully authenticated with YouTube API.");

    let client = YouTubeClient::new(Arc::new(credentials), config.request_timeout())?;
    let gateway = PlaylistGateway::new(client).with_retry(RetryPolicy::from(&config.retry));

    let reader = File::open(file)
        .map(BufReader::new)
        .with_context(|| format!("Input file not found: {}", file.display()))?;
    let summary = run_add(&gateway, playlist_id, reader)
        .await
        .with_context(|| format!("An error occurred processing the file '{}'", file.display()))?;

    println!("\n{summary}");
    if let Some(hint) = summary.hint() {
        eprintln!("\n{hint}");
    }

    Ok(())
}
