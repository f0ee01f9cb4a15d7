//! Error types for the OpenAI client.

use thiserror::Error;

/// Result type for OpenAI client operations.
pub type Result<T> = std::result::Result<T, OpenAIError>;

/// OpenAI client errors.
#[derive(Debug, Error)]
pub enum OpenAIError {
    /// Connection failure or request timeout
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response from the API
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The API answered but returned no choices or an empty message
    #[error("Empty response from OpenAI")]
    EmptyResponse,

    /// Response body or message content could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),
}
