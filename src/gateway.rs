//! Playlist gateway: verify, list existing videos, insert.
//!
//! Every remote failure is converted to `false` or an empty set here and
//! never reaches the batch runner as an error. The gateway decides what the
//! operator sees (via [`console`]) and what only goes to the log.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::config::RetrySettings;
use crate::console;
use crate::youtube::{ApiError, FailureClass, NotFoundKind, PlaylistApi, MAX_PAGE_SIZE};

/// Pause between retry attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Bounded exponential backoff for transient server errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Wait after failed attempt `attempt` (1-based): `initial × 2^(attempt−1)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1 << exponent)
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_backoff: Duration::from_secs(settings.initial_backoff_secs),
        }
    }
}

/// Retry and error-classification policy around a [`PlaylistApi`].
pub struct PlaylistGateway<A, S = TokioSleeper> {
    api: A,
    sleeper: S,
    retry: RetryPolicy,
}

impl<A: PlaylistApi> PlaylistGateway<A, TokioSleeper> {
    pub fn new(api: A) -> Self {
        Self::with_sleeper(api, TokioSleeper)
    }
}

impl<A: PlaylistApi, S: Sleeper> PlaylistGateway<A, S> {
    pub fn with_sleeper(api: A, sleeper: S) -> Self {
        Self {
            api,
            sleeper,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = RetryPolicy {
            max_attempts: retry.max_attempts.max(1),
            ..retry
        };
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Check that the playlist exists and is visible to the user.
    pub async fn verify(&self, playlist_id: &str) -> bool {
        info!("Verifying playlist ID: {playlist_id}");
        match self.api.lookup_playlist(playlist_id, 1).await {
            Ok(response) if !response.items.is_empty() => {
                info!("Playlist ID '{playlist_id}' is valid and accessible.");
                true
            }
            Ok(_) => {
                error!("Playlist ID '{playlist_id}' not found or user does not have access.");
                console::error(format!(
                    "Playlist ID '{playlist_id}' not found or you do not have access to it."
                ));
                false
            }
            Err(e) => {
                error!("API error verifying playlist ID '{playlist_id}': {e}");
                match e.classify() {
                    FailureClass::NotFound(_) => console::error(format!(
                        "Playlist ID '{playlist_id}' was not found. Please check the ID."
                    )),
                    FailureClass::Forbidden => console::error(format!(
                        "Permission denied when trying to access playlist '{playlist_id}'. \
                         Check OAuth scopes or playlist permissions."
                    )),
                    _ => console::error(format!(
                        "An API error occurred while verifying playlist ID '{playlist_id}': {e}"
                    )),
                }
                false
            }
        }
    }

    /// Every video ID currently in the playlist.
    ///
    /// Degrades to an empty set when the fetch fails; the failure is logged
    /// and shown to the operator but deduplication carries on regardless.
    pub async fn list_existing(&self, playlist_id: &str) -> HashSet<String> {
        info!("Fetching existing video IDs from playlist '{playlist_id}'...");
        match self.fetch_existing(playlist_id).await {
            Ok(ids) => {
                info!("Found {} existing video IDs in the playlist.", ids.len());
                ids
            }
            Err(e) => {
                warn!("Continuing without existing video IDs; duplicates may be added: {e}");
                HashSet::new()
            }
        }
    }

    /// Paginate the playlist under the retry policy.
    ///
    /// A retry starts again from the first page; pages fetched before the
    /// failure are discarded.
    pub async fn fetch_existing(&self, playlist_id: &str) -> Result<HashSet<String>, ApiError> {
        let max_attempts = self.retry.max_attempts;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match self.fetch_all_pages(playlist_id).await {
                Ok(ids) => return Ok(ids),
                Err(e) => e,
            };

            match err.classify() {
                FailureClass::NotFound(_) => {
                    error!("Playlist '{playlist_id}' not found while fetching existing items.");
                    console::error(format!(
                        "Playlist ID '{playlist_id}' seems to have become inaccessible after the initial check."
                    ));
                    return Err(err);
                }
                FailureClass::Transient(status) => {
                    if attempt >= max_attempts {
                        error!(
                            "Failed to fetch existing playlist items after {max_attempts} attempts due to API server errors."
                        );
                        console::error(format!(
                            "Failed to retrieve existing videos from playlist '{playlist_id}' due to API server errors."
                        ));
                        return Err(err);
                    }
                    let wait = self.retry.backoff(attempt);
                    warn!(
                        "Attempt {attempt}/{max_attempts}: API server error ({status}) fetching existing playlist items: {err}. Retrying in {}s...",
                        wait.as_secs_f64()
                    );
                    self.sleeper.sleep(wait).await;
                }
                _ => {
                    error!(
                        "Failed to fetch existing playlist items after {attempt} attempts due to non-retryable error: {err}"
                    );
                    console::error(format!(
                        "An API error occurred retrieving existing videos from playlist '{playlist_id}'."
                    ));
                    return Err(err);
                }
            }
        }
    }

    async fn fetch_all_pages(&self, playlist_id: &str) -> Result<HashSet<String>, ApiError> {
        let mut ids = HashSet::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self
                .api
                .list_items(playlist_id, page_token.as_deref(), MAX_PAGE_SIZE)
                .await?;
            ids.extend(page.video_ids().map(str::to_string));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(ids),
            }
        }
    }

    /// Add one video. Never retried; the failure class only decides what is reported.
    pub async fn insert(&self, playlist_id: &str, video_id: &str) -> bool {
        let err = match self.api.insert_item(playlist_id, video_id).await {
            Ok(item) => {
                info!(
                    "Successfully added video ID '{video_id}' to playlist '{playlist_id}'. Item: {}",
                    item.id.as_deref().unwrap_or("<unknown>")
                );
                return true;
            }
            Err(e) => e,
        };

        match err.classify() {
            FailureClass::NotFound(NotFoundKind::PlaylistMissing) => {
                error!("Playlist '{playlist_id}' not found when trying to add video '{video_id}'.");
                console::error(format!(
                    "Playlist ID '{playlist_id}' was not found. Please check the ID."
                ));
            }
            FailureClass::NotFound(NotFoundKind::VideoMissing) => {
                warn!("Video ID '{video_id}' not found or private. Skipping.");
            }
            FailureClass::NotFound(NotFoundKind::Unclassified) => {
                warn!("API error (404) adding video '{video_id}': {err}");
            }
            FailureClass::Forbidden => {
                error!(
                    "Permission denied (403) adding video '{video_id}'. Check OAuth scopes, quota, or video/playlist permissions: {err}"
                );
                console::error(format!(
                    "Permission denied when adding video '{video_id}'. Check OAuth setup, quota, or playlist settings."
                ));
            }
            FailureClass::Conflict => {
                warn!(
                    "Video ID '{video_id}' might already be in the playlist '{playlist_id}' (API reported 409 Conflict). Skipping."
                );
            }
            FailureClass::Transient(status) => {
                warn!(
                    "API server error ({status}) occurred adding video '{video_id}': {err}. This might resolve on its own later."
                );
            }
            FailureClass::Other => {
                error!("An unexpected error occurred adding video '{video_id}': {err}");
            }
        }
        false
    }
}
