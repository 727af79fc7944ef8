//! YouTube Data API access.
//!
//! # Architecture
//!
//! - [`PlaylistApi`]: Async trait for the three playlist calls this tool makes
//! - [`YouTubeClient`]: reqwest implementation against the Data API v3
//! - [`ApiError`]: Uniform failure signal with a status code and optional reason

mod client;
mod error;
pub mod types;

use async_trait::async_trait;

pub use client::{YouTubeClient, API_BASE};
pub use error::{ApiError, FailureClass, NotFoundKind, TRANSIENT_STATUSES};
pub use types::{PlaylistItem, PlaylistItemPage, PlaylistListResponse};

/// Maximum page size accepted by `playlistItems.list`.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Remote playlist operations.
#[async_trait]
pub trait PlaylistApi: Send + Sync {
    /// `playlists.list` filtered to a single ID.
    async fn lookup_playlist(
        &self,
        playlist_id: &str,
        max_results: u32,
    ) -> Result<PlaylistListResponse, ApiError>;

    /// One page of `playlistItems.list`.
    async fn list_items(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<PlaylistItemPage, ApiError>;

    /// `playlistItems.insert` for one video. Returns the created item.
    async fn insert_item(&self, playlist_id: &str, video_id: &str)
        -> Result<PlaylistItem, ApiError>;
}
