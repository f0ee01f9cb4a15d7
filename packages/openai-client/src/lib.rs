//! Minimal OpenAI chat-completions client.
//!
//! No domain logic: plain text completions and strict JSON-schema
//! structured output.
//!
//! # Example
//!
//! ```rust,ignore
//! use openai_client::{OpenAIClient, StructuredOutput};
//!
//! let client = OpenAIClient::new(api_key);
//! let query = client
//!     .complete("gpt-4o-mini", "Reply with a search query.", "Gemini 3 Launch")
//!     .await?;
//!
//! let json = client
//!     .structured_output("gpt-4o", system, user, &Draft::type_name(), Draft::openai_schema())
//!     .await?;
//! ```

pub mod error;
pub mod schema;
pub mod types;

pub use error::{OpenAIError, Result};
pub use schema::StructuredOutput;
pub use types::*;

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// OpenAI API client.
#[derive(Clone)]
pub struct OpenAIClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Self::build_http_client(DEFAULT_TIMEOUT),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Set a custom base URL (proxies, compatible gateways).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http_client = Self::build_http_client(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_http_client(timeout: Duration) -> Client {
        Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new())
    }

    /// Chat completion.
    pub async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenAI request failed");
                OpenAIError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %message, "OpenAI API error");
            return Err(OpenAIError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let raw: types::ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| OpenAIError::Parse(e.to_string()))?;

        let choice = raw
            .choices
            .into_iter()
            .next()
            .ok_or(OpenAIError::EmptyResponse)?;

        if let Some(refusal) = choice.message.refusal {
            return Err(OpenAIError::Api {
                status: status.as_u16(),
                message: format!("model refused: {refusal}"),
            });
        }

        let content = choice
            .message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or(OpenAIError::EmptyResponse)?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis(),
            finish_reason = ?choice.finish_reason,
            "OpenAI chat completion"
        );

        Ok(ChatResponse {
            content,
            finish_reason: choice.finish_reason,
            usage: raw.usage,
        })
    }

    /// Plain-text completion for a system + user prompt pair.
    pub async fn complete(
        &self,
        model: &str,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<String> {
        let request = ChatRequest::system_user(model, system, user).temperature(0.3);
        Ok(self.chat_completion(request).await?.content)
    }

    /// Strict JSON-schema output with a caller-provided schema.
    pub async fn structured_output(
        &self,
        model: &str,
        system: impl Into<String>,
        user: impl Into<String>,
        schema_name: &str,
        schema: serde_json::Value,
    ) -> Result<String> {
        let request = ChatRequest::system_user(model, system, user)
            .temperature(0.7)
            .json_schema(schema_name, schema);
        let response = self.chat_completion(request).await?;
        if response.is_truncated() {
            return Err(OpenAIError::Parse("structured response truncated at token limit".into()));
        }
        Ok(strip_code_blocks(&response.content).to_string())
    }
}
