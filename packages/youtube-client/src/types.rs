use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A video as the pipeline sees it, flattened from either the
/// playlistItems or the search endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Video {
    pub video_id: String,
    pub channel_id: String,
    pub channel_title: Option<String>,
    pub title: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub thumbnail_url: Option<String>,
}

impl Video {
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.video_id)
    }
}

/// Paged list wrapper shared by the v3 list endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaylistItem {
    pub snippet: Snippet,
    pub content_details: Option<PlaylistContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaylistContentDetails {
    pub video_id: String,
    pub video_published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchItem {
    pub id: SearchId,
    pub snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchId {
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Snippet {
    pub published_at: DateTime<Utc>,
    pub channel_id: String,
    pub channel_title: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnails: Option<Thumbnails>,
    pub resource_id: Option<ResourceId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResourceId {
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Thumbnails {
    pub high: Option<Thumbnail>,
    pub medium: Option<Thumbnail>,
    pub default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Thumbnail {
    pub url: String,
}

impl Thumbnails {
    fn best(&self) -> Option<String> {
        self.high
            .as_ref()
            .or(self.medium.as_ref())
            .or(self.default.as_ref())
            .map(|t| t.url.clone())
    }
}

impl Snippet {
    fn into_video(self, video_id: String, published_at: DateTime<Utc>) -> Video {
        Video {
            video_id,
            thumbnail_url: self.thumbnails.as_ref().and_then(Thumbnails::best),
            channel_id: self.channel_id,
            channel_title: self.channel_title,
            title: decode_entities(&self.title),
            description: decode_entities(&self.description),
            published_at,
        }
    }
}

impl PlaylistItem {
    pub(crate) fn into_video(self) -> Option<Video> {
        let (video_id, published_at) = match &self.content_details {
            Some(details) => (
                details.video_id.clone(),
                details.video_published_at.unwrap_or(self.snippet.published_at),
            ),
            None => (
                self.snippet.resource_id.as_ref()?.video_id.clone()?,
                self.snippet.published_at,
            ),
        };
        Some(self.snippet.into_video(video_id, published_at))
    }
}

impl SearchItem {
    pub(crate) fn into_video(self) -> Option<Video> {
        let video_id = self.id.video_id?;
        let published_at = self.snippet.published_at;
        Some(self.snippet.into_video(video_id, published_at))
    }
}

/// Google error envelope: `{"error": {"code", "message", "errors": [{"reason"}]}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub reason: String,
}

/// The search endpoint HTML-escapes titles and descriptions.
pub(crate) fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
