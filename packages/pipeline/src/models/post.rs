use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::text;

/// Public metadata for one published article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub title: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub url: String,
    pub slug: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_key: Option<String>,
}

impl PostRecord {
    /// Topic key used for dedup; older records without one fall back to
    /// their title, normalized the same way.
    pub fn effective_topic_key(&self) -> String {
        self.topic_key
            .clone()
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| text::topic_key(&self.title))
    }

    /// Newest first; equal dates ordered by slug so rewrites are stable.
    pub fn display_order(a: &PostRecord, b: &PostRecord) -> Ordering {
        b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug))
    }
}
