//! Page text fetcher - reqwest for HTTP, scraper for HTML parsing
//!
//! Pulls readable text out of a search result page so the researcher can
//! summarize it. No JavaScript rendering.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{Html, Node, Selector};
use tracing::debug;

use super::BasePageFetcher;
use crate::text::{normalize_whitespace, truncate_chars};

/// Browser-like User-Agent; many news sites reject obvious bots
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Candidate containers for the article body, most specific first
const MAIN_SELECTORS: [&str; 9] = [
    "article",
    "main",
    "[role='main']",
    "#content",
    "#main",
    ".post-content",
    ".entry-content",
    ".content",
    "body",
];

/// Bytes of HTML read per page; the rest of the body is dropped unread
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Elements whose text is never article content
const SKIPPED_ELEMENTS: [&str; 10] = [
    "script", "style", "noscript", "iframe", "nav", "header", "footer", "aside", "form", "svg",
];

/// Fetches pages and extracts main-content text, bounded by timeout and length
pub struct SimpleFetcher {
    client: reqwest::Client,
    max_chars: usize,
}

impl SimpleFetcher {
    pub fn new(timeout: Duration, max_chars: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, max_chars })
    }

    /// Fetch raw HTML from a URL
    async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP {} for {}", status, url);
        }

        let body = read_capped(response, MAX_BODY_BYTES).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// Read the body chunk by chunk, stopping once `limit` bytes are buffered.
async fn read_capped(mut response: reqwest::Response, limit: usize) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .context("Failed to read response body")?
    {
        let room = limit - body.len();
        if chunk.len() >= room {
            body.extend_from_slice(&chunk[..room]);
            debug!(limit, "Response body truncated");
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Readable text of the first non-empty main-content container, whitespace
/// collapsed and cut to `max_chars`.
pub fn extract_main_text(html: &str, max_chars: usize) -> String {
    let document = Html::parse_document(html);

    for selector_str in MAIN_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        for element in document.select(&selector) {
            let text = visible_text(element);
            if !text.is_empty() {
                return truncate_chars(&text, max_chars);
            }
        }
    }

    String::new()
}

fn visible_text(element: scraper::ElementRef<'_>) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in element.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let skipped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|e| SKIPPED_ELEMENTS.contains(&e.name()))
        });
        if !skipped {
            parts.push(text);
        }
    }
    normalize_whitespace(&parts.join(" "))
}

#[async_trait]
impl BasePageFetcher for SimpleFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        debug!(url = %url, "Fetching page text");
        let html = self.fetch_html(url).await?;
        let text = extract_main_text(&html, self.max_chars);
        if text.is_empty() {
            anyhow::bail!("no readable text at {}", url);
        }
        Ok(text)
    }
}
