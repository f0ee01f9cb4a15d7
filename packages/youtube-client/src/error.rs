use thiserror::Error;

pub type Result<T> = std::result::Result<T, YouTubeError>;

#[derive(Debug, Error)]
pub enum YouTubeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("YouTube API error ({status}, {reason}): {message}")]
    Api {
        status: u16,
        reason: String,
        message: String,
    },

    #[error("Invalid channel id: {0}")]
    InvalidChannel(String),
}

impl YouTubeError {
    /// Quota exhaustion or a rejected key. The caller should skip the source
    /// rather than retry within the same run.
    pub fn is_quota_or_auth(&self) -> bool {
        match self {
            Self::Api { status, reason, .. } => {
                matches!(status, 401 | 403)
                    || matches!(
                        reason.as_str(),
                        "quotaExceeded" | "dailyLimitExceeded" | "rateLimitExceeded" | "keyInvalid"
                    )
            }
            _ => false,
        }
    }
}
