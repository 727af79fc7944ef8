//! Configuration loaded from `~/.config/ytpl/config.toml`.
//!
//! Every key is optional. A missing default file means "use defaults";
//! an explicitly requested file must exist.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

pub const DEFAULT_CLIENT_SECRETS: &str = "client_secrets.json";
pub const DEFAULT_TOKEN_CACHE: &str = "token.json";

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub auth: AuthConfig,
    pub retry: RetrySettings,
    /// Per-request timeout for API calls, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth: AuthConfig::default(),
            retry: RetrySettings::default(),
            request_timeout_secs: 30,
        }
    }
}

/// Where OAuth client secrets and the token cache live.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// OAuth client file downloaded from the Google Cloud Console.
    pub client_secrets: PathBuf,
    /// Cached access/refresh token.
    pub token_cache: PathBuf,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_secrets: PathBuf::from(DEFAULT_CLIENT_SECRETS),
            token_cache: PathBuf::from(DEFAULT_TOKEN_CACHE),
        }
    }
}

/// Retry budget for fetching existing playlist items.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_secs: 1,
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Apply command-line overrides on top of the file values.
    #[must_use]
    pub fn with_overrides(
        mut self,
        client_secrets: Option<PathBuf>,
        token_cache: Option<PathBuf>,
    ) -> Self {
        if let Some(path) = client_secrets {
            self.auth.client_secrets = path;
        }
        if let Some(path) = token_cache {
            self.auth.token_cache = path;
        }
        self
    }
}

/// Load configuration.
///
/// With `explicit` set, that file must exist. Otherwise the default location
/// is read if present and defaults are used if not.
///
/// # Errors
///
/// Returns an error if a file that should be read cannot be read or parsed.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => {
            if !path.is_file() {
                bail!("config file {} does not exist", path.display());
            }
            path.to_path_buf()
        }
        None => {
            let path = config_path();
            if !path.exists() {
                return Ok(Config::default());
            }
            path
        }
    };

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_config(&content).with_context(|| format!("invalid TOML in {}", path.display()))
}

fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

/// Return the path to the default config file.
fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytpl")
        .join("config.toml")
}
