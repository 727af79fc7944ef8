//! `ytpl` - Append videos from a URL list to a YouTube playlist
//!
//! # Features
//!
//! - **URL parsing**: watch, short-link, embed, `/v/`, Shorts and live URLs
//! - **Deduplication**: existing playlist contents fetched once, grown locally
//! - **Retries**: bounded exponential backoff on transient server errors
//! - **Authentication**: Google OAuth with a cached, refreshable token
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use ytpl::{BatchRunner, Config, OAuthCredentials, PlaylistGateway, YouTubeClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let credentials = OAuthCredentials::authenticate(&config.auth).await?;
//!     let client = YouTubeClient::new(Arc::new(credentials), Duration::from_secs(30))?;
//!     let gateway = PlaylistGateway::new(client);
//!
//!     let existing = gateway.list_existing("PLxxxxxxxx").await;
//!     let input = std::io::Cursor::new("https://youtu.be/dQw4w9WgXcQ\n");
//!     let summary = BatchRunner::new(&gateway, "PLxxxxxxxx", existing).run(input).await?;
//!     println!("{summary}");
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod batch;
pub mod config;
pub mod console;
pub mod gateway;
pub mod video_id;
pub mod youtube;

pub use auth::{CredentialProvider, OAuthCredentials, StoredToken};
pub use batch::{run_add, BatchRunner, PlaylistUnavailable, RunSummary};
pub use config::{load_config, Config};
pub use gateway::{PlaylistGateway, RetryPolicy, Sleeper, TokioSleeper};
pub use video_id::extract_video_id;
pub use youtube::{ApiError, FailureClass, NotFoundKind, PlaylistApi, YouTubeClient};

/// Version of ytpl
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
