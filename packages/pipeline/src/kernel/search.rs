use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{BaseSearchService, SearchResult};

const GOOGLE_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";
const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

/// Custom Search caps `num` at 10 per request.
const GOOGLE_MAX_NUM: usize = 10;

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")
}

// =============================================================================
// Google Custom Search
// =============================================================================

/// Google Custom Search JSON API client
pub struct GoogleSearchClient {
    api_key: SecretString,
    engine_id: String,
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    items: Vec<GoogleItem>,
}

#[derive(Debug, Deserialize)]
struct GoogleItem {
    #[serde(default)]
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
}

impl GoogleSearchClient {
    pub fn new(api_key: String, engine_id: String) -> Result<Self> {
        Ok(Self {
            api_key: SecretString::from(api_key),
            engine_id,
            client: http_client()?,
            base_url: GOOGLE_SEARCH_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl BaseSearchService for GoogleSearchClient {
    async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchResult>> {
        let num = count.clamp(1, GOOGLE_MAX_NUM).to_string();

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("key", self.api_key.expose_secret()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .context("Failed to send Google search request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Google search API error {}: {}", status, body);
        }

        let google_response: GoogleResponse = response
            .json()
            .await
            .context("Failed to parse Google search response")?;

        Ok(google_response
            .items
            .into_iter()
            .take(count)
            .map(|item| SearchResult {
                title: item.title,
                link: item.link,
                snippet: item.snippet,
            })
            .collect())
    }
}

// =============================================================================
// Tavily
// =============================================================================

/// Tavily API client for web search
pub struct TavilyClient {
    api_key: SecretString,
    client: reqwest::Client,
    base_url: String,
}

/// Tavily API request
#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    search_depth: &'static str,
    max_results: usize,
}

/// Tavily API response
#[derive(Debug, Deserialize)]
struct TavilyResponse {
    results: Vec<TavilyResult>,
}

/// Individual search result from Tavily
#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

impl TavilyClient {
    /// Create a new Tavily client
    pub fn new(api_key: String) -> Result<Self> {
        Ok(Self {
            api_key: SecretString::from(api_key),
            client: http_client()?,
            base_url: TAVILY_SEARCH_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl BaseSearchService for TavilyClient {
    async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchResult>> {
        let request = TavilyRequest {
            query,
            search_depth: "basic",
            max_results: count,
        };

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .context("Failed to send Tavily search request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Tavily API error {}: {}", status, body);
        }

        let tavily_response: TavilyResponse = response
            .json()
            .await
            .context("Failed to parse Tavily response")?;

        Ok(tavily_response
            .results
            .into_iter()
            .take(count)
            .map(|r| SearchResult {
                title: r.title,
                link: r.url,
                snippet: r.content,
            })
            .collect())
    }
}
