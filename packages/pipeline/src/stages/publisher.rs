//! Publisher stage
//!
//! Writes the generated HTML, upserts the post list, marks the candidate
//! `published` and closes the run with the status document. Publishing the
//! same article twice changes nothing on disk.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::GeneratedArticle;
use crate::config::Settings;
use crate::error::{PipelineError, Result};
use crate::models::CandidateStatus;
use crate::snapshot::{PipelineStatus, RunResults, SnapshotWriter};
use crate::store::{write_atomic, CandidateStore, CandidateUpdate, PostIndex};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublisherReport {
    pub added_post: bool,
    pub total_posts: usize,
    pub output_file: Option<String>,
    #[serde(default)]
    pub file_written: bool,
    /// The candidate was `published` before this call
    #[serde(default)]
    pub already_published: bool,
}

/// HTML files under `posts/` that no post record points to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub checked: usize,
    pub orphans: Vec<String>,
    pub warnings: Vec<String>,
}

pub struct Publisher {
    settings: Settings,
    store: CandidateStore,
    posts: PostIndex,
    snapshots: SnapshotWriter,
}

impl Publisher {
    pub fn new(
        settings: Settings,
        store: CandidateStore,
        posts: PostIndex,
        snapshots: SnapshotWriter,
    ) -> Self {
        Self {
            settings,
            store,
            posts,
            snapshots,
        }
    }

    /// Publish `article` if there is one; otherwise only report the post count.
    pub fn publish(
        &self,
        article: Option<&GeneratedArticle>,
        now: DateTime<Utc>,
    ) -> Result<PublisherReport> {
        let Some(article) = article else {
            let total_posts = self.posts.read_all().len();
            info!(total_posts, "Nothing to publish");
            return Ok(PublisherReport {
                total_posts,
                ..Default::default()
            });
        };

        let file_written = self.write_html(&article.output_file, &article.html)?;
        let upsert = self.posts.upsert(article.post.clone())?;
        let already_published = self.mark_published(&article.candidate_id, now)?;

        // Replaying an article that is already live publishes nothing new.
        if already_published && !file_written && !upsert.changed {
            info!(
                candidate_id = %article.candidate_id,
                output_file = %article.output_file,
                "Article already published, nothing changed"
            );
            return Ok(PublisherReport {
                total_posts: upsert.total,
                already_published,
                ..Default::default()
            });
        }

        info!(
            candidate_id = %article.candidate_id,
            output_file = %article.output_file,
            file_written,
            added_post = upsert.inserted,
            total_posts = upsert.total,
            "Article published"
        );

        Ok(PublisherReport {
            added_post: upsert.inserted,
            total_posts: upsert.total,
            output_file: Some(article.output_file.clone()),
            file_written,
            already_published,
        })
    }

    /// Write only when the content differs. Returns whether a write happened.
    fn write_html(&self, output_file: &str, html: &str) -> Result<bool> {
        let path = self.settings.site_dir.join(output_file);
        match fs::read(&path) {
            Ok(existing) if existing == html.as_bytes() => return Ok(false),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(PipelineError::io(&path, e)),
        }
        write_atomic(&path, html.as_bytes())?;
        Ok(true)
    }

    /// Move the candidate to `published`. Returns whether it already was.
    fn mark_published(&self, candidate_id: &str, now: DateTime<Utc>) -> Result<bool> {
        match self.store.find_by_id(candidate_id) {
            None => {
                warn!(candidate_id, "Published candidate no longer in store");
                return Ok(false);
            }
            Some(candidate) if candidate.status == CandidateStatus::Published => return Ok(true),
            Some(_) => {}
        }

        self.store.update_by_id(
            candidate_id,
            CandidateUpdate::replace(move |mut candidate| {
                candidate.transition(CandidateStatus::Published, now)?;
                Ok(candidate)
            }),
        )?;
        Ok(false)
    }

    /// Scan `<SITE_DIR>/posts` for HTML files no post url points to. Reports,
    /// never deletes.
    pub fn validate(&self) -> Result<ValidationReport> {
        let dir = self.settings.posts_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ValidationReport::default()),
            Err(e) => return Err(PipelineError::io(&dir, e)),
        };

        let urls: HashSet<String> = self.posts.read_all().into_iter().map(|p| p.url).collect();

        let mut files: Vec<String> = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| PipelineError::io(&dir, e))?.path();
            let is_html = path.extension().is_some_and(|ext| ext == "html");
            if let (true, Some(name)) = (is_html, path.file_name().and_then(|n| n.to_str())) {
                files.push(name.to_string());
            }
        }
        files.sort();

        let mut report = ValidationReport {
            checked: files.len(),
            ..Default::default()
        };
        for name in files {
            let url = format!("posts/{name}");
            if !urls.contains(&url) {
                let warning = format!("orphaned HTML file with no post record: {url}");
                warn!(file = %url, "Orphaned post HTML");
                report.warnings.push(warning);
                report.orphans.push(url);
            }
        }
        Ok(report)
    }

    /// Validate (when enabled) and write the status document for a finished run.
    pub fn finalize(&self, results: &RunResults, now: DateTime<Utc>) -> Result<PipelineStatus> {
        let validation = if self.settings.validate_output {
            Some(self.validate()?)
        } else {
            None
        };
        let status = PipelineStatus::completed(results, validation, now);
        self.snapshots.write_status(&status)?;
        info!(status = ?status.status, generated_file = ?status.generated_file, "Run status written");
        Ok(status)
    }

    /// Best-effort status document for a run aborted by `error`.
    pub fn record_failure(&self, results: &RunResults, error: &str, now: DateTime<Utc>) -> PipelineStatus {
        let status = PipelineStatus::failed(results, error, now);
        if let Err(e) = self.snapshots.write_status(&status) {
            warn!(error = %e, "Failed to write failure snapshot");
        }
        status
    }
}
