// TestDependencies - mock implementations for testing
//
// Provides mock services that can be injected into PipelineDeps for tests.
// Every mock records its calls so tests can assert on what a stage asked for.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{
    BaseAI, BasePageFetcher, BaseSearchService, BaseVideoSource, ListedVideo, PipelineDeps,
    SearchResult, VideoSourceError,
};

// =============================================================================
// Mock AI (Generic LLM capabilities)
// =============================================================================

/// Which BaseAI method was called
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AICallKind {
    Complete,
    Structured,
}

/// Arguments captured from an AI call
#[derive(Debug, Clone)]
pub struct AICall {
    pub kind: AICallKind,
    pub model: String,
    pub system: String,
    pub user: String,
}

struct AIRule {
    pattern: String,
    response: std::result::Result<String, String>,
}

/// Answers by rule: the first rule whose pattern occurs in the system or
/// user prompt wins. Unmatched calls get a fixed default.
pub struct MockAI {
    rules: Arc<Mutex<Vec<AIRule>>>,
    calls: Arc<Mutex<Vec<AICall>>>,
}

impl MockAI {
    pub fn new() -> Self {
        Self {
            rules: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Respond with `response` when a prompt contains `pattern`
    pub fn with_rule(self, pattern: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules.lock().unwrap().push(AIRule {
            pattern: pattern.into(),
            response: Ok(response.into()),
        });
        self
    }

    /// Respond with a serialized value when a prompt contains `pattern`
    pub fn with_json_rule<T: serde::Serialize>(self, pattern: impl Into<String>, data: &T) -> Self {
        let json = serde_json::to_string(data).expect("Failed to serialize mock response");
        self.with_rule(pattern, json)
    }

    /// Fail calls whose prompt contains `pattern`
    pub fn failing_on(self, pattern: impl Into<String>, error: impl Into<String>) -> Self {
        self.rules.lock().unwrap().push(AIRule {
            pattern: pattern.into(),
            response: Err(error.into()),
        });
        self
    }

    /// Get all calls made to the AI
    pub fn calls(&self) -> Vec<AICall> {
        self.calls.lock().unwrap().clone()
    }

    fn respond(&self, kind: AICallKind, model: &str, system: &str, user: &str) -> Result<String> {
        self.calls.lock().unwrap().push(AICall {
            kind,
            model: model.to_string(),
            system: system.to_string(),
            user: user.to_string(),
        });

        let rules = self.rules.lock().unwrap();
        match rules
            .iter()
            .find(|r| system.contains(&r.pattern) || user.contains(&r.pattern))
        {
            Some(rule) => rule.response.clone().map_err(|e| anyhow::anyhow!(e)),
            None => Ok("Mock AI response".to_string()),
        }
    }
}

impl Default for MockAI {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseAI for MockAI {
    async fn complete(&self, model: &str, system: &str, user: &str) -> Result<String> {
        self.respond(AICallKind::Complete, model, system, user)
    }

    async fn generate_structured(
        &self,
        model: &str,
        system: &str,
        user: &str,
        _schema_name: &str,
        _schema: serde_json::Value,
    ) -> Result<String> {
        self.respond(AICallKind::Structured, model, system, user)
    }
}

// =============================================================================
// Mock Search Service
// =============================================================================

pub struct MockSearch {
    results: Arc<Mutex<HashMap<String, Vec<SearchResult>>>>,
    failing: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<(String, usize)>>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self {
            results: Arc::new(Mutex::new(HashMap::new())),
            failing: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Results returned for an exact query
    pub fn with_results(self, query: &str, results: Vec<SearchResult>) -> Self {
        self.results
            .lock()
            .unwrap()
            .insert(query.to_string(), results);
        self
    }

    /// Make searches for `query` fail
    pub fn failing_for(self, query: &str) -> Self {
        self.failing.lock().unwrap().push(query.to_string());
        self
    }

    /// Queries searched, in call order
    pub fn queries(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(q, _)| q.clone()).collect()
    }
}

impl Default for MockSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseSearchService for MockSearch {
    async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchResult>> {
        self.calls.lock().unwrap().push((query.to_string(), count));

        if self.failing.lock().unwrap().iter().any(|q| q == query) {
            anyhow::bail!("mock search failure for {query}");
        }

        let mut results = self
            .results
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default();
        results.truncate(count);
        Ok(results)
    }
}

// =============================================================================
// Mock Page Fetcher
// =============================================================================

pub struct MockPageFetcher {
    pages: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockPageFetcher {
    pub fn new() -> Self {
        Self {
            pages: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Text served for `url`; any other url fails
    pub fn with_page(self, url: &str, text: impl Into<String>) -> Self {
        self.pages.lock().unwrap().insert(url.to_string(), text.into());
        self
    }

    pub fn was_fetched(&self, url: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|u| u == url)
    }
}

impl Default for MockPageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BasePageFetcher for MockPageFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.calls.lock().unwrap().push(url.to_string());
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("HTTP 404 Not Found for {url}"))
    }
}

// =============================================================================
// Mock Video Source
// =============================================================================

enum ChannelBehavior {
    Videos(Vec<ListedVideo>),
    Fail(String),
    QuotaExceeded,
}

pub struct MockVideoSource {
    channels: Arc<Mutex<HashMap<String, ChannelBehavior>>>,
    calls: Arc<Mutex<Vec<(String, DateTime<Utc>, usize)>>>,
}

impl MockVideoSource {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Videos listed for a channel; the mock applies the window and cap itself
    pub fn with_videos(self, channel_id: &str, videos: Vec<ListedVideo>) -> Self {
        self.channels
            .lock()
            .unwrap()
            .insert(channel_id.to_string(), ChannelBehavior::Videos(videos));
        self
    }

    pub fn failing_channel(self, channel_id: &str, error: impl Into<String>) -> Self {
        self.channels
            .lock()
            .unwrap()
            .insert(channel_id.to_string(), ChannelBehavior::Fail(error.into()));
        self
    }

    pub fn quota_exceeded(self, channel_id: &str) -> Self {
        self.channels
            .lock()
            .unwrap()
            .insert(channel_id.to_string(), ChannelBehavior::QuotaExceeded);
        self
    }

    /// Channels listed, in call order
    pub fn listed_channels(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(c, _, _)| c.clone()).collect()
    }
}

impl Default for MockVideoSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseVideoSource for MockVideoSource {
    async fn list_recent(
        &self,
        channel_id: &str,
        published_after: DateTime<Utc>,
        max_results: usize,
    ) -> std::result::Result<Vec<ListedVideo>, VideoSourceError> {
        self.calls
            .lock()
            .unwrap()
            .push((channel_id.to_string(), published_after, max_results));

        match self.channels.lock().unwrap().get(channel_id) {
            Some(ChannelBehavior::Videos(videos)) => {
                let mut videos: Vec<_> = videos
                    .iter()
                    .filter(|v| v.published_at > published_after)
                    .cloned()
                    .collect();
                videos.sort_by(|a, b| b.published_at.cmp(&a.published_at));
                videos.truncate(max_results);
                Ok(videos)
            }
            Some(ChannelBehavior::Fail(error)) => {
                Err(VideoSourceError::Other(anyhow::anyhow!("{}", error)))
            }
            Some(ChannelBehavior::QuotaExceeded) => Err(VideoSourceError::QuotaOrAuth(
                "quotaExceeded: daily limit reached".to_string(),
            )),
            None => Ok(Vec::new()),
        }
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// Bundle of mocks; keeps handles for assertions after the deps are handed out
#[derive(Clone)]
pub struct TestDependencies {
    pub ai: Arc<MockAI>,
    pub search: Arc<MockSearch>,
    pub fetcher: Arc<MockPageFetcher>,
    pub videos: Arc<MockVideoSource>,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            ai: Arc::new(MockAI::new()),
            search: Arc::new(MockSearch::new()),
            fetcher: Arc::new(MockPageFetcher::new()),
            videos: Arc::new(MockVideoSource::new()),
        }
    }

    pub fn mock_ai(mut self, ai: MockAI) -> Self {
        self.ai = Arc::new(ai);
        self
    }

    pub fn mock_search(mut self, search: MockSearch) -> Self {
        self.search = Arc::new(search);
        self
    }

    pub fn mock_fetcher(mut self, fetcher: MockPageFetcher) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    pub fn mock_videos(mut self, videos: MockVideoSource) -> Self {
        self.videos = Arc::new(videos);
        self
    }

    /// PipelineDeps wired to these mocks
    pub fn deps(&self) -> PipelineDeps {
        PipelineDeps {
            ai: Some(self.ai.clone()),
            search: Some(self.search.clone()),
            fetcher: Some(self.fetcher.clone()),
            videos: Some(self.videos.clone()),
        }
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
