//! Typed errors for the pipeline.
//!
//! Conditions that abort a run, or the stage work for one candidate, live
//! here. Per-item failures are recorded on candidates and in stage reports
//! instead of being raised.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::CandidateStatus;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A credential the stage cannot run without is absent from the environment
    #[error("missing required credential: {0}")]
    MissingCredential(&'static str),

    /// The sources catalog is empty
    #[error("no sources configured")]
    NoSources,

    /// Every configured source failed during collection
    #[error("all {count} sources failed: {}", messages.join("; "))]
    AllSourcesFailed { count: usize, messages: Vec<String> },

    /// A status change that would break forward-only progression
    #[error("invalid status transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: CandidateStatus,
        to: CandidateStatus,
    },

    /// The web search for a candidate failed; it has no fallback
    #[error("search failed for {query:?}: {message}")]
    SearchFailed { query: String, message: String },

    /// A merge patch tried to set a field that only transitions may change
    #[error("merge patch for {id} may not set {field}")]
    ProtectedField { id: String, field: &'static str },

    /// Reading or writing a file failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document could not be encoded or decoded
    #[error("JSON error on {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Invalid configuration value or catalog file
    #[error("config error: {0}")]
    Config(String),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
