use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::text;

/// Where a candidate sits in the pipeline.
///
/// Progression is forward-only: `collected → researched → generated →
/// published`, with `skipped` reachable from `collected`/`researched` and
/// `failed` reachable from `researched`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
    Collected,
    Researched,
    Generated,
    Published,
    Skipped,
    Failed,
}

impl CandidateStatus {
    pub const ALL: [CandidateStatus; 6] = [
        Self::Collected,
        Self::Researched,
        Self::Generated,
        Self::Published,
        Self::Skipped,
        Self::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collected => "collected",
            Self::Researched => "researched",
            Self::Generated => "generated",
            Self::Published => "published",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }

    /// No stage will touch the candidate again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Published | Self::Skipped | Self::Failed)
    }

    /// Waiting for research or generation; subject to the pending cap.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Collected | Self::Researched)
    }

    pub fn can_transition_to(&self, next: CandidateStatus) -> bool {
        use CandidateStatus::*;
        matches!(
            (self, next),
            (Collected, Researched)
                | (Collected, Skipped)
                | (Researched, Generated)
                | (Researched, Skipped)
                | (Researched, Failed)
                | (Generated, Published)
        )
    }
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel a candidate was collected from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    pub name: String,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(alias = "channelId")]
    pub external_id: String,
    #[serde(default)]
    pub focus: Vec<String>,
}

fn default_platform() -> String {
    "youtube".to_string()
}

/// Video metadata captured once at collection time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnapshot {
    pub video_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMethod {
    Ai,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub original: String,
    pub extracted: String,
    pub method: QueryMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryMethod {
    Ai,
    Extractive,
    Snippet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSummary {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    pub summary: String,
    #[serde(default = "default_summary_method")]
    pub method: SummaryMethod,
}

fn default_summary_method() -> SummaryMethod {
    SummaryMethod::Snippet
}

/// A recoverable error recorded against a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageError {
    pub stage: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// One tracked video-derived content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub status: CandidateStatus,
    pub source: SourceDescriptor,
    pub video: VideoSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<SearchQuery>,
    #[serde(default)]
    pub search_summaries: Vec<SearchSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub researched_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<StageError>,
}

impl Candidate {
    /// Store key for a platform video id.
    pub fn id_for(video_id: &str) -> String {
        format!("yt-{video_id}")
    }

    /// A freshly collected candidate.
    pub fn collected(source: SourceDescriptor, video: VideoSnapshot, now: DateTime<Utc>) -> Self {
        Self {
            id: Self::id_for(&video.video_id),
            status: CandidateStatus::Collected,
            topic_key: Some(text::topic_key(&video.title)).filter(|k| !k.is_empty()),
            source,
            video,
            search_query: None,
            search_summaries: Vec::new(),
            created_at: now,
            updated_at: now,
            researched_at: None,
            generated_at: None,
            published_at: None,
            slug: None,
            output_file: None,
            failure_reason: None,
            errors: Vec::new(),
        }
    }

    /// Stored topic key, else one derived from the video title.
    pub fn effective_topic_key(&self) -> String {
        self.topic_key
            .clone()
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| text::topic_key(&self.video.title))
    }

    /// Move to `next`, stamping the matching timestamp.
    pub fn transition(&mut self, next: CandidateStatus, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        self.updated_at = now;
        match next {
            CandidateStatus::Researched => self.researched_at = Some(now),
            CandidateStatus::Generated => self.generated_at = Some(now),
            CandidateStatus::Published => self.published_at = Some(now),
            _ => {}
        }
        Ok(())
    }

    pub fn record_error(&mut self, stage: &str, message: impl Into<String>, now: DateTime<Utc>) {
        self.errors.push(StageError {
            stage: stage.to_string(),
            message: message.into(),
            at: now,
        });
        self.updated_at = now;
    }
}
