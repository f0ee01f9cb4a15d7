//! Minimal YouTube Data API v3 client.
//!
//! Only what a channel watcher needs: list a channel's recent uploads.
//! Channel ids of the usual `UC...` form are read through the channel's
//! uploads playlist (1 quota unit per page); anything else falls back to the
//! search endpoint (100 units).
//!
//! # Example
//!
//! ```rust,ignore
//! use youtube_client::YouTubeClient;
//!
//! let client = YouTubeClient::new("api-key".into());
//! let since = chrono::Utc::now() - chrono::Duration::days(3);
//! for video in client.list_recent_videos("UC_x5XG1OV2P6uZZ5FSM9Ttw", since, 5).await? {
//!     println!("{} {}", video.published_at, video.title);
//! }
//! ```

pub mod error;
pub mod types;

pub use error::{Result, YouTubeError};
pub use types::Video;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use types::{ErrorEnvelope, ListResponse, PlaylistItem, SearchItem};

const BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Upper bound the API accepts for `maxResults`.
const MAX_PAGE_SIZE: usize = 50;

/// Pages read from an uploads playlist before giving up on finding the window edge.
const MAX_PAGES: usize = 4;

pub struct YouTubeClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Videos published after `published_after`, newest first, at most `max_results`.
    pub async fn list_recent_videos(
        &self,
        channel_id: &str,
        published_after: DateTime<Utc>,
        max_results: usize,
    ) -> Result<Vec<Video>> {
        let channel_id = channel_id.trim();
        if channel_id.is_empty() {
            return Err(YouTubeError::InvalidChannel(channel_id.to_string()));
        }

        let mut videos = match uploads_playlist_id(channel_id) {
            Some(playlist_id) => self.recent_uploads(&playlist_id, published_after).await?,
            None => {
                self.search_channel(channel_id, published_after, max_results)
                    .await?
            }
        };

        videos.retain(|v| v.published_at > published_after);
        videos.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        videos.truncate(max_results);

        tracing::debug!(channel_id, count = videos.len(), "Listed recent videos");
        Ok(videos)
    }

    /// Walk the uploads playlist until an item older than the window shows up.
    async fn recent_uploads(
        &self,
        playlist_id: &str,
        published_after: DateTime<Utc>,
    ) -> Result<Vec<Video>> {
        let mut videos = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let page_size = MAX_PAGE_SIZE.to_string();
            let mut query = vec![
                ("part", "snippet,contentDetails"),
                ("playlistId", playlist_id),
                ("maxResults", page_size.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let page: ListResponse<PlaylistItem> = self.get("playlistItems", &query).await?;
            let before = videos.len();
            videos.extend(page.items.into_iter().filter_map(PlaylistItem::into_video));
            let reached_edge = videos[before..]
                .iter()
                .any(|v| v.published_at <= published_after);

            match page.next_page_token {
                Some(token) if !reached_edge => page_token = Some(token),
                _ => break,
            }
        }

        Ok(videos)
    }

    async fn search_channel(
        &self,
        channel_id: &str,
        published_after: DateTime<Utc>,
        max_results: usize,
    ) -> Result<Vec<Video>> {
        let published_after = published_after.to_rfc3339_opts(SecondsFormat::Secs, true);
        let max_results = max_results.clamp(1, MAX_PAGE_SIZE).to_string();
        let query = [
            ("part", "snippet"),
            ("channelId", channel_id),
            ("type", "video"),
            ("order", "date"),
            ("publishedAfter", published_after.as_str()),
            ("maxResults", max_results.as_str()),
        ];

        let page: ListResponse<SearchItem> = self.get("search", &query).await?;
        Ok(page
            .items
            .into_iter()
            .filter_map(SearchItem::into_video)
            .collect())
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let (reason, message) = match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => (
                    envelope
                        .error
                        .errors
                        .into_iter()
                        .next()
                        .map(|e| e.reason)
                        .unwrap_or_default(),
                    envelope.error.message,
                ),
                Err(_) => (String::new(), body),
            };
            tracing::warn!(endpoint, status = %status, reason = %reason, "YouTube API error");
            return Err(YouTubeError::Api {
                status: status.as_u16(),
                reason,
                message,
            });
        }

        Ok(resp.json().await?)
    }
}

/// `UCxxxx` channels publish uploads to the `UUxxxx` playlist.
fn uploads_playlist_id(channel_id: &str) -> Option<String> {
    channel_id
        .strip_prefix("UC")
        .filter(|rest| !rest.is_empty())
        .map(|rest| format!("UU{rest}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap()
    }

    fn playlist_item(video_id: &str, published_at: DateTime<Utc>) -> Value {
        json!({
            "snippet": {
                "publishedAt": published_at.to_rfc3339(),
                "channelId": "UC_tech",
                "title": format!("Video {video_id}"),
                "resourceId": {"videoId": video_id}
            },
            "contentDetails": {"videoId": video_id, "videoPublishedAt": published_at.to_rfc3339()}
        })
    }

    fn client(server: &MockServer) -> YouTubeClient {
        YouTubeClient::new("key".into()).with_base_url(server.uri())
    }

    #[test]
    fn test_uploads_playlist_id() {
        assert_eq!(
            uploads_playlist_id("UC_x5XG1OV2P6uZZ5FSM9Ttw").as_deref(),
            Some("UU_x5XG1OV2P6uZZ5FSM9Ttw")
        );
        assert_eq!(uploads_playlist_id("@somehandle"), None);
        assert_eq!(uploads_playlist_id("UC"), None);
    }

    #[test]
    fn test_quota_errors_are_classified() {
        let quota = YouTubeError::Api {
            status: 403,
            reason: "quotaExceeded".into(),
            message: "quota".into(),
        };
        assert!(quota.is_quota_or_auth());

        let server = YouTubeError::Api {
            status: 500,
            reason: "backendError".into(),
            message: "oops".into(),
        };
        assert!(!server.is_quota_or_auth());
    }

    #[tokio::test]
    async fn test_blank_channel_is_rejected() {
        let client = YouTubeClient::new("key".into());
        let err = client
            .list_recent_videos("  ", Utc::now(), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, YouTubeError::InvalidChannel(_)));
    }

    #[tokio::test]
    async fn test_uploads_are_paged_until_the_window_edge() {
        let server = MockServer::start().await;
        // Mounted first so they take precedence over the first-page mock
        Mock::given(method("GET"))
            .and(path("/playlistItems"))
            .and(query_param("pageToken", "p3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/playlistItems"))
            .and(query_param("pageToken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [playlist_item("c", at(6)), playlist_item("old", at(1))],
                "nextPageToken": "p3"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/playlistItems"))
            .and(query_param("playlistId", "UU_tech"))
            .and(query_param("key", "key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [playlist_item("a", at(10)), playlist_item("b", at(8))],
                "nextPageToken": "p2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let videos = client(&server)
            .list_recent_videos("UC_tech", at(3), 50)
            .await
            .unwrap();

        let ids: Vec<_> = videos.iter().map(|v| v.video_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_listing_is_truncated_newest_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/playlistItems"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [playlist_item("b", at(8)), playlist_item("a", at(10)), playlist_item("c", at(6))]
            })))
            .mount(&server)
            .await;

        let videos = client(&server)
            .list_recent_videos("UC_tech", at(3), 2)
            .await
            .unwrap();
        let ids: Vec<_> = videos.iter().map(|v| v.video_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_handles_fall_back_to_search() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("channelId", "@techchannel"))
            .and(query_param("order", "date"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "id": {"videoId": "s1"},
                    "snippet": {
                        "publishedAt": at(9).to_rfc3339(),
                        "channelId": "UC_tech",
                        "title": "Q&amp;A: Gemini 3"
                    }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let videos = client(&server)
            .list_recent_videos("@techchannel", at(3), 5)
            .await
            .unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].title, "Q&A: Gemini 3");
    }

    #[tokio::test]
    async fn test_quota_exceeded_response_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {
                    "code": 403,
                    "message": "The request cannot be completed because you have exceeded your quota.",
                    "errors": [{"reason": "quotaExceeded", "domain": "youtube.quota"}]
                }
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .list_recent_videos("UC_tech", at(3), 3)
            .await
            .unwrap_err();
        assert!(err.is_quota_or_auth());
        match err {
            YouTubeError::Api { status, reason, message } => {
                assert_eq!(status, 403);
                assert_eq!(reason, "quotaExceeded");
                assert!(message.contains("exceeded your quota"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_not_quota() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let err = client(&server)
            .list_recent_videos("UC_tech", at(3), 3)
            .await
            .unwrap_err();
        assert!(!err.is_quota_or_auth());
    }
}
