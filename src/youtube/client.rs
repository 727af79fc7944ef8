//! YouTube Data API v3 HTTP client
//!
//! Features:
//! - Bearer token from an injected [`CredentialProvider`]
//! - One token renewal and replay when the API answers 401
//! - Google error envelopes decoded into [`ApiError::Status`]
//! - TLS 1.3 (rustls), Brotli/Gzip compression, connection keep-alive

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::{ApiError, PlaylistApi, PlaylistItem, PlaylistItemPage, PlaylistListResponse};
use crate::auth::CredentialProvider;

/// Production API root.
pub const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Authenticated YouTube Data API client.
pub struct YouTubeClient {
    client: Client,
    credentials: Arc<dyn CredentialProvider>,
    base_url: String,
}

impl YouTubeClient {
    /// Create a client for the production API.
    pub fn new(credentials: Arc<dyn CredentialProvider>, timeout: Duration) -> Result<Self> {
        Self::with_base_url(credentials, timeout, API_BASE)
    }

    /// Create a client for an alternative API root (proxies, test servers).
    pub fn with_base_url(
        credentials: Arc<dyn CredentialProvider>,
        timeout: Duration,
        base_url: &str,
    ) -> Result<Self> {
        let client = Client::builder()
            // Keep the connection to googleapis.com alive across the batch
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .use_rustls_tls()
            .brotli(true)
            .gzip(true)
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            credentials,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/{resource}", self.base_url)
    }

    /// Send an authorized request, renewing the token once on 401.
    async fn send<F>(&self, build: F) -> Result<Response, ApiError>
    where
        F: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        let token = self
            .credentials
            .access_token()
            .await
            .map_err(|e| ApiError::Auth(format!("{e:#}")))?;
        let mut response = build(&self.client).bearer_auth(&token).send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("Access token rejected, renewing");
            let token = self
                .credentials
                .refresh_or_reauthenticate()
                .await
                .map_err(|e| ApiError::Auth(format!("{e:#}")))?;
            response = build(&self.client).bearer_auth(&token).send().await?;
        }

        let status = response.status();
        if status.is_success() {
            debug!(status = %status, "Response received");
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_response(status.as_u16(), &body))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PlaylistApi for YouTubeClient {
    #[instrument(skip(self))]
    async fn lookup_playlist(
        &self,
        playlist_id: &str,
        max_results: u32,
    ) -> Result<PlaylistListResponse, ApiError> {
        let url = self.url("playlists");
        let max_results = max_results.to_string();
        let response = self
            .send(|client| {
                client.get(&url).query(&[
                    ("part", "id"),
                    ("id", playlist_id),
                    ("maxResults", max_results.as_str()),
                ])
            })
            .await?;
        Self::decode(response).await
    }

    #[instrument(skip(self))]
    async fn list_items(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<PlaylistItemPage, ApiError> {
        let url = self.url("playlistItems");
        let max_results = max_results.to_string();
        let response = self
            .send(|client| {
                let request = client.get(&url).query(&[
                    ("part", "snippet"),
                    ("playlistId", playlist_id),
                    ("maxResults", max_results.as_str()),
                ]);
                match page_token {
                    Some(token) => request.query(&[("pageToken", token)]),
                    None => request,
                }
            })
            .await?;
        Self::decode(response).await
    }

    #[instrument(skip(self))]
    async fn insert_item(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<PlaylistItem, ApiError> {
        let url = self.url("playlistItems");
        let body = PlaylistItem::new_video(playlist_id, video_id);
        let response = self
            .send(|client| client.post(&url).query(&[("part", "snippet")]).json(&body))
            .await?;
        Self::decode(response).await
    }
}
