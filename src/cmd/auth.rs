use anyhow::{Context, Result};

use ytpl::{Config, OAuthCredentials};

/// Authenticate and populate the token cache without touching any playlist.
pub async fn cmd_auth(config: &Config) -> Result<()> {
    let credentials = OAuthCredentials::authenticate(&config.auth)
        .await
        .context("Failed to authenticate with YouTube API")?;

    println!("Authenticated with YouTube API.");
    println!("Credentials cached at {}", credentials.cache_path().display());

    Ok(())
}
