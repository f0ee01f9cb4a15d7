// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Stages own the prompts, fallbacks and status changes; these traits only
// move bytes to and from external services.
//
// Naming convention: Base* for trait names (e.g., BaseAI, BaseSearchService)

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// AI Trait (Infrastructure - Generic LLM capabilities)
// =============================================================================

#[async_trait]
pub trait BaseAI: Send + Sync {
    /// Complete a system + user prompt (returns raw text response)
    async fn complete(&self, model: &str, system: &str, user: &str) -> Result<String>;

    /// Generate structured output with a JSON schema
    /// Returns JSON string conforming to the provided schema
    async fn generate_structured(
        &self,
        model: &str,
        system: &str,
        user: &str,
        schema_name: &str,
        schema: serde_json::Value,
    ) -> Result<String> {
        // Default implementation ignores schema and just prompts for JSON
        let _ = (schema_name, schema);
        let system = format!("{system}\n\nRespond with valid JSON.");
        self.complete(model, &system, user).await
    }
}

// =============================================================================
// Web Search Trait (Infrastructure)
// =============================================================================

/// One ranked web search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

#[async_trait]
pub trait BaseSearchService: Send + Sync {
    /// Search the web, returning at most `count` results in rank order
    async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchResult>>;
}

// =============================================================================
// Page Fetcher Trait (Infrastructure)
// =============================================================================

#[async_trait]
pub trait BasePageFetcher: Send + Sync {
    /// Fetch a page and return its readable main-content text
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

// =============================================================================
// Video Source Trait (Infrastructure)
// =============================================================================

/// A video as listed by the source platform
#[derive(Debug, Clone, PartialEq)]
pub struct ListedVideo {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub thumbnail_url: Option<String>,
}

/// Error from a video source, classified so the collector can tell a
/// dead credential apart from a flaky channel.
#[derive(Debug, thiserror::Error)]
pub enum VideoSourceError {
    #[error("quota or authorization error: {0}")]
    QuotaOrAuth(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait BaseVideoSource: Send + Sync {
    /// Videos from `channel_id` published after `published_after`, newest first
    async fn list_recent(
        &self,
        channel_id: &str,
        published_after: DateTime<Utc>,
        max_results: usize,
    ) -> std::result::Result<Vec<ListedVideo>, VideoSourceError>;
}
