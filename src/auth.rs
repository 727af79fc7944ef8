//! Authentication Module
//!
//! Google OAuth 2.0 for installed applications:
//! - Client secrets from the Google Cloud Console download
//! - Token cache on disk (JSON) so consent is only needed once
//! - Refresh-token renewal, falling back to the browser consent flow
//!
//! API clients receive credentials through [`CredentialProvider`], which is
//! constructed once and injected. There is no process-wide token state.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::console;

/// Read/write access to the user's YouTube playlists.
pub const YOUTUBE_SCOPE: &str = "https://www.googleapis.com/auth/youtube";

/// Tokens are renewed this long before Google says they expire.
const EXPIRY_MARGIN_SECS: i64 = 300;

/// How long the consent flow waits for the browser redirect.
const CONSENT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(300);

/// Source of bearer tokens for API requests.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// A token that is valid now, renewing first if needed.
    async fn access_token(&self) -> Result<String>;

    /// Force renewal: use the refresh token if possible, otherwise ask the
    /// user to authorize again. Called after the API rejects a token.
    async fn refresh_or_reauthenticate(&self) -> Result<String>;
}

// ============================================================================
// Client secrets
// ============================================================================

/// OAuth client from `client_secrets.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// The console download nests the client under `installed` or `web`.
#[derive(Debug, Deserialize)]
struct SecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid client secrets in {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        let file: SecretsFile = serde_json::from_str(content)?;
        file.installed
            .or(file.web)
            .ok_or_else(|| anyhow!("expected an \"installed\" or \"web\" client section"))
    }

    /// Consent page URL for the loopback redirect flow.
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<url::Url> {
        let url = url::Url::parse_with_params(
            &self.auth_uri,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", YOUTUBE_SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )?;
        Ok(url)
    }
}

// ============================================================================
// Tokens
// ============================================================================

/// Token as persisted in the cache file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl StoredToken {
    /// Valid if not within [`EXPIRY_MARGIN_SECS`] of expiry. Tokens without an
    /// expiry are trusted until the API rejects them.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .map_or(true, |expires_at| now + Duration::seconds(EXPIRY_MARGIN_SECS) < expires_at)
    }

    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let token = serde_json::from_str(&content)
            .with_context(|| format!("invalid token cache {}", path.display()))?;
        Ok(Some(token))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp_path = path.with_extension("tmp");
        write_private(&tmp_path, json.as_bytes())
            .with_context(|| format!("writing {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }
}

/// The cache holds a refresh token: owner read/write only.
#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies to newly created files
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, contents)
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
}

impl TokenResponse {
    /// Google usually omits the refresh token on refresh; keep the old one then.
    fn into_stored(self, previous_refresh: Option<String>, now: DateTime<Utc>) -> StoredToken {
        StoredToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at: self.expires_in.map(|secs| now + Duration::seconds(secs)),
            scope: self.scope,
        }
    }
}

// ============================================================================
// OAuth credentials
// ============================================================================

/// Installed-app OAuth credentials backed by a token cache file.
pub struct OAuthCredentials {
    secrets: ClientSecrets,
    cache_path: PathBuf,
    http: Client,
    token: Mutex<StoredToken>,
}

impl OAuthCredentials {
    /// Load or obtain a usable token.
    ///
    /// A missing client secrets file is fatal. A broken token cache only
    /// causes re-authentication. Failing to save the cache is a warning.
    pub async fn authenticate(config: &AuthConfig) -> Result<Self> {
        let secrets_path = &config.client_secrets;
        if !secrets_path.exists() {
            bail!(
                "{} not found. Download the OAuth client file from the Google Cloud Console and place it at {}",
                secrets_path.file_name().map_or_else(
                    || secrets_path.display().to_string(),
                    |name| name.to_string_lossy().into_owned()
                ),
                secrets_path.display()
            );
        }
        let secrets = ClientSecrets::load(secrets_path)?;
        let http = Client::builder()
            .use_rustls_tls()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let cached = match StoredToken::load(&config.token_cache) {
            Ok(token) => {
                if token.is_some() {
                    info!("Loaded credentials from {}", config.token_cache.display());
                }
                token
            }
            Err(e) => {
                warn!("Could not load token cache: {e:#}. Re-authenticating.");
                None
            }
        };

        let (token, changed) = match cached {
            Some(token) if token.is_valid_at(Utc::now()) => (token, false),
            Some(token) if token.refresh_token.is_some() => {
                info!("Credentials expired, refreshing...");
                match refresh_token(&http, &secrets, &token).await {
                    Ok(fresh) => (fresh, true),
                    Err(e) => {
                        warn!("Failed to refresh token: {e:#}. Re-authenticating.");
                        remove_cache(&config.token_cache);
                        (run_consent_flow(&http, &secrets).await?, true)
                    }
                }
            }
            _ => {
                info!("No valid credentials found, starting authentication flow.");
                (run_consent_flow(&http, &secrets).await?, true)
            }
        };

        if changed {
            save_cache(&token, &config.token_cache);
        }

        Ok(Self {
            secrets,
            cache_path: config.token_cache.clone(),
            http,
            token: Mutex::new(token),
        })
    }

    /// Path the token is cached at.
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    async fn renew(&self, token: &mut StoredToken) -> Result<()> {
        let fresh = if token.refresh_token.is_some() {
            match refresh_token(&self.http, &self.secrets, token).await {
                Ok(fresh) => fresh,
                Err(e) => {
                    warn!("Failed to refresh token: {e:#}. Re-authenticating.");
                    run_consent_flow(&self.http, &self.secrets).await?
                }
            }
        } else {
            run_consent_flow(&self.http, &self.secrets).await?
        };
        save_cache(&fresh, &self.cache_path);
        *token = fresh;
        Ok(())
    }
}

#[async_trait]
impl CredentialProvider for OAuthCredentials {
    async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if !token.is_valid_at(Utc::now()) {
            debug!("Access token expired, renewing");
            self.renew(&mut token).await?;
        }
        Ok(token.access_token.clone())
    }

    async fn refresh_or_reauthenticate(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        self.renew(&mut token).await?;
        Ok(token.access_token.clone())
    }
}

fn save_cache(token: &StoredToken, path: &Path) {
    match token.save(path) {
        Ok(()) => info!("Credentials saved to {}", path.display()),
        Err(e) => console::warn(format!(
            "Could not save credentials to {}: {e:#}",
            path.display()
        )),
    }
}

fn remove_cache(path: &Path) {
    if path.exists() {
        match std::fs::remove_file(path) {
            Ok(()) => info!("Removed invalid token file: {}", path.display()),
            Err(e) => warn!("Error removing token file {}: {e}", path.display()),
        }
    }
}

async fn refresh_token(
    http: &Client,
    secrets: &ClientSecrets,
    token: &StoredToken,
) -> Result<StoredToken> {
    let refresh = token
        .refresh_token
        .as_deref()
        .ok_or_else(|| anyhow!("no refresh token"))?;
    let response: TokenResponse = http
        .post(&secrets.token_uri)
        .form(&[
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("refresh_token", refresh),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    debug!("Token refreshed");
    Ok(response.into_stored(token.refresh_token.clone(), Utc::now()))
}

/// Browser consent with a loopback redirect on an ephemeral port.
async fn run_consent_flow(http: &Client, secrets: &ClientSecrets) -> Result<StoredToken> {
    let listener = TcpListener::bind(("127.0.0.1", 0))
        .await
        .context("binding OAuth redirect listener")?;
    let redirect_uri = format!("http://127.0.0.1:{}/", listener.local_addr()?.port());
    let state = uuid::Uuid::new_v4().simple().to_string();
    let url = secrets.authorization_url(&redirect_uri, &state)?;

    eprintln!("Please visit this URL to authorize this application:\n\n    {url}\n");
    info!("Waiting for authorization redirect on {redirect_uri}");

    let code = receive_code(&listener, &state, CONSENT_TIMEOUT).await?;

    let response: TokenResponse = http
        .post(&secrets.token_uri)
        .form(&[
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("code", code.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .context("exchanging authorization code")?
        .error_for_status()
        .context("token endpoint rejected the authorization code")?
        .json()
        .await?;
    info!("Authorization complete");
    Ok(response.into_stored(None, Utc::now()))
}

/// Wait for the redirect, giving up after `limit` so unattended runs do not hang.
async fn receive_code(
    listener: &TcpListener,
    state: &str,
    limit: std::time::Duration,
) -> Result<String> {
    tokio::time::timeout(limit, wait_for_code(listener, state))
        .await
        .map_err(|_| {
            anyhow!(
                "timed out after {}s waiting for authorization in the browser",
                limit.as_secs()
            )
        })?
}

async fn wait_for_code(listener: &TcpListener, state: &str) -> Result<String> {
    let (mut stream, peer) = listener.accept().await?;
    debug!(%peer, "Redirect received");

    let mut buf = vec![0u8; 8192];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);
    let outcome = parse_redirect(&request, state);

    let body = match &outcome {
        Ok(_) => "Authorization complete. You may close this window.",
        Err(_) => "Authorization failed. Return to the terminal for details.",
    };
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        debug!("Could not answer redirect: {e}");
    }
    outcome
}

/// Pull the authorization code out of the redirect's request line.
fn parse_redirect(request: &str, expected_state: &str) -> Result<String> {
    let target = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .ok_or_else(|| anyhow!("malformed redirect request"))?;
    let url = url::Url::parse("http://127.0.0.1")?.join(target)?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        bail!("authorization was denied: {error}");
    }
    if state.as_deref() != Some(expected_state) {
        bail!("authorization redirect carried an unexpected state");
    }
    code.filter(|c| !c.is_empty())
        .ok_or_else(|| anyhow!("authorization redirect carried no code"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRETS: &str = r#"{
        "installed": {
            "client_id": "123.apps.googleusercontent.com",
            "client_secret": "shh",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "redirect_uris": ["http://localhost"]
        }
    }"#;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn parses_installed_and_web_secrets() {
        let secrets = ClientSecrets::parse(SECRETS).unwrap();
        assert_eq!(secrets.client_id, "123.apps.googleusercontent.com");

        let web = ClientSecrets::parse(r#"{"web": {"client_id": "w", "client_secret": "s"}}"#)
            .unwrap();
        assert_eq!(web.client_id, "w");
        assert_eq!(web.token_uri, "https://oauth2.googleapis.com/token");

        assert!(ClientSecrets::parse(r#"{"other": {}}"#).is_err());
    }

    #[test]
    fn authorization_url_requests_offline_youtube_scope() {
        let secrets = ClientSecrets::parse(SECRETS).unwrap();
        let url = secrets
            .authorization_url("http://127.0.0.1:4567/", "abc")
            .unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["scope"], YOUTUBE_SCOPE);
        assert_eq!(pairs["access_type"], "offline");
        assert_eq!(pairs["redirect_uri"], "http://127.0.0.1:4567/");
        assert_eq!(pairs["state"], "abc");
        assert_eq!(pairs["response_type"], "code");
    }

    #[test]
    fn token_validity_respects_margin() {
        let token = StoredToken {
            access_token: "t".into(),
            refresh_token: None,
            expires_at: Some(at(10_000)),
            scope: None,
        };
        assert!(token.is_valid_at(at(10_000 - EXPIRY_MARGIN_SECS - 1)));
        assert!(!token.is_valid_at(at(10_000 - EXPIRY_MARGIN_SECS)));
        assert!(!token.is_valid_at(at(20_000)));

        let no_expiry = StoredToken { expires_at: None, ..token };
        assert!(no_expiry.is_valid_at(at(20_000)));
    }

    #[test]
    fn refresh_keeps_previous_refresh_token() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token": "new", "expires_in": 3599, "token_type": "Bearer"}"#)
                .unwrap();
        let stored = response.into_stored(Some("old-refresh".into()), at(0));
        assert_eq!(stored.access_token, "new");
        assert_eq!(stored.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(stored.expires_at, Some(at(3599)));
    }

    #[test]
    fn token_cache_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token.json");
        assert_eq!(StoredToken::load(&path).unwrap(), None);

        let token = StoredToken {
            access_token: "abc".into(),
            refresh_token: Some("def".into()),
            expires_at: Some(at(1_700_000_000)),
            scope: Some(YOUTUBE_SCOPE.into()),
        };
        token.save(&path).unwrap();
        assert_eq!(StoredToken::load(&path).unwrap(), Some(token));
    }

    #[test]
    fn corrupt_token_cache_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(StoredToken::load(&path).is_err());
    }

    #[test]
    fn parse_redirect_extracts_code() {
        let request = "GET /?state=xyz&code=4%2F0Abc&scope=youtube HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n";
        assert_eq!(parse_redirect(request, "xyz").unwrap(), "4/0Abc");
    }

    #[test]
    fn parse_redirect_rejects_bad_redirects() {
        let wrong_state = "GET /?state=other&code=c HTTP/1.1\r\n\r\n";
        assert!(parse_redirect(wrong_state, "xyz").is_err());

        let denied = "GET /?error=access_denied&state=xyz HTTP/1.1\r\n\r\n";
        let err = parse_redirect(denied, "xyz").unwrap_err();
        assert!(err.to_string().contains("access_denied"));

        let no_code = "GET /?state=xyz HTTP/1.1\r\n\r\n";
        assert!(parse_redirect(no_code, "xyz").is_err());

        assert!(parse_redirect("", "xyz").is_err());
    }

    #[tokio::test]
    async fn missing_client_secrets_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = AuthConfig {
            client_secrets: dir.path().join("client_secrets.json"),
            token_cache: dir.path().join("token.json"),
        };
        let err = OAuthCredentials::authenticate(&config).await.err().unwrap();
        assert!(err.to_string().contains("client_secrets.json not found"));
    }

    #[cfg(unix)]
    #[test]
    fn token_cache_is_private_to_owner() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        // A stale world-readable temp file must not keep its mode.
        std::fs::write(path.with_extension("tmp"), "old").unwrap();
        std::fs::set_permissions(
            path.with_extension("tmp"),
            std::fs::Permissions::from_mode(0o644),
        )
        .unwrap();

        let token = StoredToken {
            access_token: "abc".into(),
            refresh_token: Some("def".into()),
            expires_at: None,
            scope: None,
        };
        token.save(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn consent_redirect_wait_times_out() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let err = receive_code(&listener, "xyz", std::time::Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"), "{err:#}");
    }

    #[tokio::test]
    async fn consent_redirect_delivers_code() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let browser = tokio::spawn(async move {
            let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
            stream
                .write_all(b"GET /?state=xyz&code=abc HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n")
                .await
                .unwrap();
            let mut reply = String::new();
            stream.read_to_string(&mut reply).await.unwrap();
            reply
        });

        let code = receive_code(&listener, "xyz", std::time::Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(code, "abc");
        assert!(browser.await.unwrap().contains("Authorization complete"));
    }
}
