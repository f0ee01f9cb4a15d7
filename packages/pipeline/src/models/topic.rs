use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dedup evidence: when a topic was last turned into an article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicHistoryEntry {
    pub topic_key: String,
    pub first_seen: DateTime<Utc>,
    pub last_published_at: DateTime<Utc>,
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub video_title: String,
    #[serde(default)]
    pub draft_url: String,
}
