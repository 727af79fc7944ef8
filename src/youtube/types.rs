// ============================================================================
// YouTube Data API v3 Request/Response Types
// ============================================================================
//
// Only the fields this tool reads or writes are modelled.
// See: <https://developers.google.com/youtube/v3/docs/playlistItems>

use serde::{Deserialize, Serialize};

/// Response of `playlists.list`.
#[derive(Debug, Default, Deserialize)]
pub struct PlaylistListResponse {
    #[serde(default)]
    pub items: Vec<PlaylistResource>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistResource {
    pub id: String,
}

/// One page of `playlistItems.list`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemPage {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    pub next_page_token: Option<String>,
}

impl PlaylistItemPage {
    /// Video IDs embedded in this page's items. Items without one are skipped.
    pub fn video_ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| {
            item.snippet
                .as_ref()
                .and_then(|snippet| snippet.resource_id.as_ref())
                .and_then(|resource| resource.video_id.as_deref())
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlaylistItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<PlaylistItemSnippet>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemSnippet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<ResourceId>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
}

impl PlaylistItem {
    /// Body for `playlistItems.insert`.
    pub fn new_video(playlist_id: &str, video_id: &str) -> Self {
        Self {
            id: None,
            snippet: Some(PlaylistItemSnippet {
                playlist_id: Some(playlist_id.to_string()),
                resource_id: Some(ResourceId {
                    kind: "youtube#video".to_string(),
                    video_id: Some(video_id.to_string()),
                }),
            }),
        }
    }
}
