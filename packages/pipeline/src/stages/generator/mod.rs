//! Generator stage
//!
//! Turns the first `researched` candidate into a rendered article. One
//! candidate per run. A topic seen within the dedup window skips the
//! candidate; a draft that cannot be obtained fails it. Both are terminal.

pub mod image;
pub mod prompts;
pub mod render;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use openai_client::{strip_code_blocks, StructuredOutput};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{Catalogs, Settings};
use crate::error::Result;
use crate::kernel::BaseAI;
use crate::models::{
    Candidate, CandidateStatus, ImageAsset, PostRecord, Tag, TopicHistoryEntry,
};
use crate::store::{CandidateStore, PostIndex, TopicHistory};
use crate::text::{limit_slug, slugify};

pub use image::{image_seed, select_image, string_hash};
pub use prompts::{build_article_prompt, ARTICLE_SYSTEM_PROMPT};
pub use render::{render, RenderContext, DEFAULT_TEMPLATE};

/// Longest title part of a post slug.
const SLUG_TITLE_MAX_CHARS: usize = 80;

/// Structured article draft requested from the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDraft {
    pub title: String,
    pub summary: String,
    pub intro: String,
    pub sections: Vec<DraftSection>,
    pub conclusion: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DraftSection {
    pub heading: String,
    pub overview: String,
    #[serde(default)]
    pub sub_sections: Vec<DraftSubSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DraftSubSection {
    pub heading: String,
    pub body: String,
}

impl ArticleDraft {
    /// Reject drafts that cannot make a page.
    fn validate(&self) -> std::result::Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("draft has an empty title".to_string());
        }
        if self.sections.is_empty() {
            return Err("draft has no sections".to_string());
        }
        Ok(())
    }
}

/// Where a duplicate topic was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DuplicateMatch {
    TopicHistory,
    Post,
}

/// A rendered article ready for the publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedArticle {
    pub candidate_id: String,
    pub topic_key: String,
    pub slug: String,
    pub output_file: String,
    pub html: String,
    pub post: PostRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum GeneratorOutcome {
    NoWork,
    #[serde(rename_all = "camelCase")]
    Duplicate {
        candidate_id: String,
        topic_key: String,
        matched_by: DuplicateMatch,
    },
    #[serde(rename_all = "camelCase")]
    Failed {
        candidate_id: String,
        error: String,
    },
    Generated(GeneratedArticle),
}

impl GeneratorOutcome {
    pub fn article(&self) -> Option<&GeneratedArticle> {
        match self {
            Self::Generated(article) => Some(article),
            _ => None,
        }
    }

    pub fn into_article(self) -> Option<GeneratedArticle> {
        match self {
            Self::Generated(article) => Some(article),
            _ => None,
        }
    }

    /// Compact form for the status document (no HTML).
    pub fn summary(&self) -> GeneratorSummary {
        match self {
            Self::NoWork => GeneratorSummary {
                outcome: "noWork".into(),
                ..Default::default()
            },
            Self::Duplicate {
                candidate_id,
                topic_key,
                matched_by,
            } => GeneratorSummary {
                outcome: "duplicate".into(),
                candidate_id: Some(candidate_id.clone()),
                topic_key: Some(topic_key.clone()),
                matched_by: Some(*matched_by),
                ..Default::default()
            },
            Self::Failed {
                candidate_id,
                error,
            } => GeneratorSummary {
                outcome: "failed".into(),
                candidate_id: Some(candidate_id.clone()),
                error: Some(error.clone()),
                ..Default::default()
            },
            Self::Generated(article) => GeneratorSummary {
                outcome: "generated".into(),
                candidate_id: Some(article.candidate_id.clone()),
                topic_key: Some(article.topic_key.clone()),
                slug: Some(article.slug.clone()),
                output_file: Some(article.output_file.clone()),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorSummary {
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_by: Option<DuplicateMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `topic_key` was used within `window` before `now`, per history or posts.
pub fn find_duplicate(
    topic_key: &str,
    history: &[TopicHistoryEntry],
    posts: &[PostRecord],
    now: DateTime<Utc>,
    window: Duration,
) -> Option<DuplicateMatch> {
    let since = now - window;

    if history
        .iter()
        .any(|e| e.topic_key == topic_key && e.last_published_at >= since)
    {
        return Some(DuplicateMatch::TopicHistory);
    }
    if posts
        .iter()
        .any(|p| p.effective_topic_key() == topic_key && p.date >= since)
    {
        return Some(DuplicateMatch::Post);
    }
    None
}

/// `YYYY-MM-DD-<title slug>`; the topic key stands in for a title with no
/// usable characters.
pub fn post_slug(date: DateTime<Utc>, title: &str, topic_key: &str) -> String {
    let title_slug = limit_slug(&slugify(title), SLUG_TITLE_MAX_CHARS);
    let title_slug = if title_slug.is_empty() {
        topic_key.to_string()
    } else {
        title_slug
    };
    format!("{}-{}", date.format("%Y-%m-%d"), title_slug)
}

pub struct Generator {
    settings: Settings,
    catalogs: Catalogs,
    store: CandidateStore,
    posts: PostIndex,
    history: TopicHistory,
    ai: Arc<dyn BaseAI>,
}

impl Generator {
    pub fn new(
        settings: Settings,
        catalogs: Catalogs,
        store: CandidateStore,
        posts: PostIndex,
        history: TopicHistory,
        ai: Arc<dyn BaseAI>,
    ) -> Self {
        Self {
            settings,
            catalogs,
            store,
            posts,
            history,
            ai,
        }
    }

    pub async fn generate(&self, now: DateTime<Utc>) -> Result<GeneratorOutcome> {
        let mut candidates = self.store.read_all();
        let Some(idx) = candidates
            .iter()
            .position(|c| c.status == CandidateStatus::Researched)
        else {
            info!("No researched candidate to generate");
            return Ok(GeneratorOutcome::NoWork);
        };

        let candidate = &mut candidates[idx];
        let topic_key = candidate.effective_topic_key();

        if let Some(matched_by) = find_duplicate(
            &topic_key,
            &self.history.read_all(),
            &self.posts.read_all(),
            now,
            self.settings.dedupe_window(),
        ) {
            info!(candidate_id = %candidate.id, topic_key = %topic_key, ?matched_by, "Duplicate topic, skipping");
            candidate.failure_reason = Some(format!(
                "topic {topic_key} already covered within {} days",
                self.settings.dedupe_window_days
            ));
            candidate.transition(CandidateStatus::Skipped, now)?;
            let outcome = GeneratorOutcome::Duplicate {
                candidate_id: candidate.id.clone(),
                topic_key,
                matched_by,
            };
            self.store.write_all(&candidates)?;
            return Ok(outcome);
        }

        let draft = match self.request_draft(candidate).await {
            Ok(draft) => draft,
            Err(error) => {
                warn!(candidate_id = %candidate.id, error = %error, "Article draft failed");
                candidate.failure_reason = Some(error.clone());
                candidate.transition(CandidateStatus::Failed, now)?;
                let outcome = GeneratorOutcome::Failed {
                    candidate_id: candidate.id.clone(),
                    error,
                };
                self.store.write_all(&candidates)?;
                return Ok(outcome);
            }
        };

        let article = self.build_article(candidate, &topic_key, &draft, now);
        candidate.slug = Some(article.slug.clone());
        candidate.output_file = Some(article.output_file.clone());
        candidate.transition(CandidateStatus::Generated, now)?;

        let entry = TopicHistoryEntry {
            topic_key: topic_key.clone(),
            first_seen: now,
            last_published_at: now,
            source_name: candidate.source.name.clone(),
            video_title: candidate.video.title.clone(),
            draft_url: article.output_file.clone(),
        };

        self.store.write_all(&candidates)?;
        self.history.upsert(entry)?;

        info!(
            candidate_id = %article.candidate_id,
            slug = %article.slug,
            tags = ?article.post.tags,
            image = %article.post.image,
            "Article generated"
        );
        Ok(GeneratorOutcome::Generated(article))
    }

    async fn request_draft(&self, candidate: &Candidate) -> std::result::Result<ArticleDraft, String> {
        let user = build_article_prompt(candidate, &self.catalogs.tags);
        let raw = self
            .ai
            .generate_structured(
                &self.settings.article_model,
                ARTICLE_SYSTEM_PROMPT,
                &user,
                &ArticleDraft::type_name(),
                ArticleDraft::openai_schema(),
            )
            .await
            .map_err(|e| format!("article request failed: {e}"))?;

        let draft: ArticleDraft = serde_json::from_str(strip_code_blocks(&raw))
            .map_err(|e| format!("article draft is not valid JSON: {e}"))?;
        draft.validate()?;
        Ok(draft)
    }

    fn build_article(
        &self,
        candidate: &Candidate,
        topic_key: &str,
        draft: &ArticleDraft,
        now: DateTime<Utc>,
    ) -> GeneratedArticle {
        let raw_tags: Vec<Tag> = draft.tags.iter().cloned().map(Tag::Raw).collect();
        let tags = self.catalogs.tags.normalize_all(&raw_tags);

        let slug = post_slug(now, &draft.title, topic_key);
        let output_file = format!("posts/{slug}.html");

        let seed = image_seed(
            Some(topic_key),
            Some(slug.as_str()),
            Some(draft.title.as_str()),
            &candidate.id,
        );
        let image: ImageAsset = select_image(&self.catalogs.images, seed, &tags, Some(topic_key));

        let template = self
            .catalogs
            .template
            .as_deref()
            .unwrap_or(DEFAULT_TEMPLATE);
        let html = render(
            template,
            &RenderContext {
                draft,
                date: now,
                tags: &tags,
                image: &image,
                video_title: &candidate.video.title,
                video_url: &candidate.video.url,
                source_name: &candidate.source.name,
                references: &candidate.search_summaries,
            },
        );

        let post = PostRecord {
            title: draft.title.trim().to_string(),
            date: now,
            summary: draft.summary.trim().to_string(),
            tags: tags.iter().map(|t| t.label.clone()).collect(),
            url: output_file.clone(),
            slug: slug.clone(),
            image: image.url.clone(),
            topic_key: Some(topic_key.to_string()),
        };

        GeneratedArticle {
            candidate_id: candidate.id.clone(),
            topic_key: topic_key.to_string(),
            slug,
            output_file,
            html,
            post,
        }
    }
}
