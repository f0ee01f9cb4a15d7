//! Result of one external call.
//!
//! Query extraction and page summarization have well-defined fallbacks, so a
//! failure there is not an error: it is a `Degraded` value carrying the
//! reason. A call with no fallback, such as the web search, ends in `Fatal`
//! and aborts the work that depended on it.

use std::fmt::Display;

use crate::error::PipelineError;

#[derive(Debug)]
pub enum Outcome<T> {
    Ok(T),
    Degraded { value: T, reason: String },
    Fatal(PipelineError),
}

impl<T> Outcome<T> {
    pub fn degraded(value: T, reason: impl Display) -> Self {
        Self::Degraded {
            value,
            reason: reason.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Degraded { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Ok(value) | Self::Degraded { value, .. } => Some(value),
            Self::Fatal(_) => None,
        }
    }

    /// Collapse to the usable value, surfacing only `Fatal`.
    pub fn into_result(self) -> Result<T, PipelineError> {
        match self {
            Self::Ok(value) | Self::Degraded { value, .. } => Ok(value),
            Self::Fatal(err) => Err(err),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Ok(value) => Outcome::Ok(f(value)),
            Self::Degraded { value, reason } => Outcome::Degraded {
                value: f(value),
                reason,
            },
            Self::Fatal(err) => Outcome::Fatal(err),
        }
    }
}
