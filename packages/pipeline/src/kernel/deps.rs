//! Pipeline dependencies for stages (using traits for testability)
//!
//! Every external service sits behind a `Base*` trait so stages can be
//! driven by the mocks in `test_dependencies`.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use openai_client::OpenAIClient;
use secrecy::ExposeSecret;
use youtube_client::YouTubeClient;

use super::{
    BaseAI, BasePageFetcher, BaseSearchService, BaseVideoSource, GoogleSearchClient, ListedVideo,
    SimpleFetcher, TavilyClient, VideoSourceError,
};
use crate::config::{Config, SearchCredentials};
use crate::error::PipelineError;

// =============================================================================
// OpenAIClient Adapter (implements BaseAI trait)
// =============================================================================

/// Wrapper around OpenAIClient that implements BaseAI trait
pub struct OpenAIAdapter(pub OpenAIClient);

#[async_trait]
impl BaseAI for OpenAIAdapter {
    async fn complete(&self, model: &str, system: &str, user: &str) -> Result<String> {
        self.0
            .complete(model, system, user)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))
    }

    async fn generate_structured(
        &self,
        model: &str,
        system: &str,
        user: &str,
        schema_name: &str,
        schema: serde_json::Value,
    ) -> Result<String> {
        self.0
            .structured_output(model, system, user, schema_name, schema)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))
    }
}

// =============================================================================
// YouTubeClient Adapter (implements BaseVideoSource trait)
// =============================================================================

/// Wrapper around YouTubeClient that implements BaseVideoSource trait
pub struct YouTubeAdapter(pub YouTubeClient);

#[async_trait]
impl BaseVideoSource for YouTubeAdapter {
    async fn list_recent(
        &self,
        channel_id: &str,
        published_after: DateTime<Utc>,
        max_results: usize,
    ) -> std::result::Result<Vec<ListedVideo>, VideoSourceError> {
        let videos = self
            .0
            .list_recent_videos(channel_id, published_after, max_results)
            .await
            .map_err(|e| {
                if e.is_quota_or_auth() {
                    VideoSourceError::QuotaOrAuth(e.to_string())
                } else {
                    VideoSourceError::Other(anyhow::anyhow!("{}", e))
                }
            })?;

        Ok(videos
            .into_iter()
            .map(|v| ListedVideo {
                url: v.watch_url(),
                video_id: v.video_id,
                title: v.title,
                description: v.description,
                published_at: v.published_at,
                thumbnail_url: v.thumbnail_url,
            })
            .collect())
    }
}

// =============================================================================
// PipelineDeps
// =============================================================================

/// External services available to stages. A stage that needs a service
/// checks for it and raises a missing-credential error when it is absent.
#[derive(Clone, Default)]
pub struct PipelineDeps {
    pub ai: Option<Arc<dyn BaseAI>>,
    pub search: Option<Arc<dyn BaseSearchService>>,
    pub fetcher: Option<Arc<dyn BasePageFetcher>>,
    pub videos: Option<Arc<dyn BaseVideoSource>>,
}

impl PipelineDeps {
    /// Build real clients for whichever credentials are configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let credentials = &config.credentials;

        let ai = credentials.openai_api_key.as_ref().map(|key| {
            Arc::new(OpenAIAdapter(OpenAIClient::new(key.expose_secret()))) as Arc<dyn BaseAI>
        });

        let videos = credentials.youtube_api_key.as_ref().map(|key| {
            Arc::new(YouTubeAdapter(YouTubeClient::new(
                key.expose_secret().to_string(),
            ))) as Arc<dyn BaseVideoSource>
        });

        let search: Option<Arc<dyn BaseSearchService>> = match credentials.require_search() {
            Ok(SearchCredentials::Google { api_key, engine_id }) => Some(Arc::new(
                GoogleSearchClient::new(api_key.expose_secret().to_string(), engine_id.to_string())?,
            )),
            Ok(SearchCredentials::Tavily { api_key }) => Some(Arc::new(TavilyClient::new(
                api_key.expose_secret().to_string(),
            )?)),
            Err(_) => None,
        };

        let fetcher = Arc::new(SimpleFetcher::new(
            config.settings.fetch_timeout,
            config.settings.page_text_max_chars,
        )?) as Arc<dyn BasePageFetcher>;

        Ok(Self {
            ai,
            search,
            fetcher: Some(fetcher),
            videos,
        })
    }

    pub fn require_ai(&self) -> std::result::Result<Arc<dyn BaseAI>, PipelineError> {
        self.ai
            .clone()
            .ok_or(PipelineError::MissingCredential("OPENAI_API_KEY"))
    }

    pub fn require_search(&self) -> std::result::Result<Arc<dyn BaseSearchService>, PipelineError> {
        self.search
            .clone()
            .ok_or(PipelineError::MissingCredential("GOOGLE_SEARCH_API_KEY"))
    }

    pub fn require_fetcher(&self) -> std::result::Result<Arc<dyn BasePageFetcher>, PipelineError> {
        self.fetcher
            .clone()
            .ok_or_else(|| PipelineError::Config("no page fetcher configured".into()))
    }

    pub fn require_videos(&self) -> std::result::Result<Arc<dyn BaseVideoSource>, PipelineError> {
        self.videos
            .clone()
            .ok_or(PipelineError::MissingCredential("YOUTUBE_API_KEY"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn youtube(server: &MockServer) -> YouTubeAdapter {
        YouTubeAdapter(YouTubeClient::new("yt-key".into()).with_base_url(server.uri()))
    }

    fn since() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_youtube_quota_maps_to_quota_or_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/playlistItems"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {
                    "code": 403,
                    "message": "The request cannot be completed because you have exceeded your quota.",
                    "errors": [{"reason": "quotaExceeded"}]
                }
            })))
            .mount(&server)
            .await;

        let err = youtube(&server)
            .list_recent("UC_tech", since(), 50)
            .await
            .unwrap_err();
        assert!(matches!(err, VideoSourceError::QuotaOrAuth(ref m) if m.contains("quotaExceeded")));
    }

    #[tokio::test]
    async fn test_youtube_server_error_maps_to_other() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
            .mount(&server)
            .await;

        let err = youtube(&server)
            .list_recent("UC_tech", since(), 50)
            .await
            .unwrap_err();
        assert!(matches!(err, VideoSourceError::Other(_)));
    }

    #[tokio::test]
    async fn test_youtube_videos_map_to_listed_videos() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/playlistItems"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "snippet": {
                        "publishedAt": "2025-01-01T12:00:00Z",
                        "channelId": "UC_tech",
                        "title": "Gemini 3 Launch",
                        "description": "Everything announced",
                        "thumbnails": {"high": {"url": "https://i.ytimg.com/hq.jpg"}}
                    },
                    "contentDetails": {"videoId": "abc123", "videoPublishedAt": "2025-01-01T12:00:00Z"}
                }]
            })))
            .mount(&server)
            .await;

        let videos = youtube(&server).list_recent("UC_tech", since(), 50).await.unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].video_id, "abc123");
        assert_eq!(videos[0].url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(videos[0].thumbnail_url.as_deref(), Some("https://i.ytimg.com/hq.jpg"));
    }
}
