//! Video ID extraction from YouTube URLs.
//!
//! ## Shapes Recognised (in priority order)
//!
//! - `youtube.com/watch?v=<id>` - Canonical watch page
//! - `youtu.be/<id>` - Short link
//! - `youtube.com/embed/<id>` - Embedded player
//! - `youtube.com/v/<id>` - Legacy player
//! - `youtube.com/shorts/<id>` - Shorts
//! - `youtube.com/live/<id>` - Live broadcast
//!
//! Scheme and `www.` are optional. Patterns are searched anywhere in the
//! line, so trailing query parameters and fragments are ignored.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

struct UrlPattern {
    name: &'static str,
    regex: Regex,
}

static PATTERNS: LazyLock<Vec<UrlPattern>> = LazyLock::new(|| {
    [
        ("watch", r"(?:https?://)?(?:www\.)?youtube\.com/watch\?v=([A-Za-z0-9_-]{11})"),
        ("short_link", r"(?:https?://)?(?:www\.)?youtu\.be/([A-Za-z0-9_-]{11})"),
        ("embed", r"(?:https?://)?(?:www\.)?youtube\.com/embed/([A-Za-z0-9_-]{11})"),
        ("legacy_v", r"(?:https?://)?(?:www\.)?youtube\.com/v/([A-Za-z0-9_-]{11})"),
        ("shorts", r"(?:https?://)?(?:www\.)?youtube\.com/shorts/([A-Za-z0-9_-]{11})"),
        ("live", r"(?:https?://)?(?:www\.)?youtube\.com/live/([A-Za-z0-9_-]{11})"),
    ]
    .into_iter()
    .map(|(name, pattern)| UrlPattern {
        name,
        // Literal patterns; a failure here is a programming error.
        regex: Regex::new(pattern).expect("video URL pattern must compile"),
    })
    .collect()
});

/// Extract the video ID from a YouTube URL.
///
/// Returns `None` when no known URL shape matches. That is an expected
/// outcome for junk lines, not an error.
///
/// ```
/// assert_eq!(
///     ytpl::extract_video_id("https://youtu.be/dQw4w9WgXcQ?t=15").as_deref(),
///     Some("dQw4w9WgXcQ")
/// );
/// assert_eq!(ytpl::extract_video_id("https://example.com/dQw4w9WgXcQ"), None);
/// ```
pub fn extract_video_id(url: &str) -> Option<String> {
    for pattern in PATTERNS.iter() {
        if let Some(id) = pattern.regex.captures(url).and_then(|caps| caps.get(1)) {
            debug!(shape = pattern.name, id = id.as_str(), "Matched video URL");
            return Some(id.as_str().to_string());
        }
    }

    debug!("Could not extract video ID from URL: {url}");
    None
}
