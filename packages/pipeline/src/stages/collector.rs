//! Collector stage
//!
//! Lists recent uploads for every configured source, creates `collected`
//! candidates for videos not seen before, then applies retention: stale
//! terminal candidates are pruned and the pending backlog is capped.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::{PipelineError, Result};
use crate::kernel::{BaseVideoSource, ListedVideo, VideoSourceError};
use crate::models::{Candidate, SourceDescriptor, VideoSnapshot};
use crate::store::CandidateStore;

const SUPPORTED_PLATFORM: &str = "youtube";

/// Upper bound on videos listed per source; the per-source cap is applied
/// after known ids are filtered out.
const LIST_LIMIT: usize = 50;

/// A source that could not be listed this run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFailure {
    pub source: String,
    pub message: String,
    /// Quota exhausted or key rejected; the source was skipped
    #[serde(default)]
    pub quota_or_auth: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorReport {
    pub sources: usize,
    pub new_candidates: Vec<String>,
    pub errors: Vec<SourceFailure>,
    pub pruned: usize,
    pub capped: usize,
    pub total_candidates: usize,
}

/// How many candidates retention removed, by rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionStats {
    pub pruned: usize,
    pub capped: usize,
}

pub struct Collector {
    settings: Settings,
    store: CandidateStore,
    videos: Arc<dyn BaseVideoSource>,
}

impl Collector {
    pub fn new(settings: Settings, store: CandidateStore, videos: Arc<dyn BaseVideoSource>) -> Self {
        Self {
            settings,
            store,
            videos,
        }
    }

    pub async fn collect(
        &self,
        sources: &[SourceDescriptor],
        now: DateTime<Utc>,
    ) -> Result<CollectorReport> {
        if sources.is_empty() {
            return Err(PipelineError::NoSources);
        }

        let published_after = now - self.settings.lookback();
        let cap = self.settings.max_videos_per_source;

        let mut candidates = self.store.read_all();
        let mut known: HashSet<String> = candidates.iter().map(|c| c.id.clone()).collect();
        let mut report = CollectorReport {
            sources: sources.len(),
            ..Default::default()
        };

        info!(
            sources = sources.len(),
            published_after = %published_after,
            cap,
            "Collecting recent videos"
        );

        for source in sources {
            let listed = match self.list_source(source, published_after).await {
                Ok(listed) => listed,
                Err(failure) => {
                    warn!(
                        source = %source.name,
                        error = %failure.message,
                        quota_or_auth = failure.quota_or_auth,
                        "Source failed, skipping"
                    );
                    report.errors.push(failure);
                    continue;
                }
            };

            let fresh: Vec<ListedVideo> = listed
                .into_iter()
                .filter(|video| known.insert(Candidate::id_for(&video.video_id)))
                .take(cap)
                .collect();

            for video in fresh {
                let candidate = Candidate::collected(source.clone(), snapshot(video), now);
                info!(candidate_id = %candidate.id, source = %source.name, title = %candidate.video.title, "New candidate");
                report.new_candidates.push(candidate.id.clone());
                candidates.push(candidate);
            }
        }

        if report.errors.len() == sources.len() {
            return Err(PipelineError::AllSourcesFailed {
                count: sources.len(),
                messages: report
                    .errors
                    .iter()
                    .map(|e| format!("{}: {}", e.source, e.message))
                    .collect(),
            });
        }

        let (candidates, stats) = apply_retention(
            candidates,
            now,
            self.settings.retention(),
            self.settings.max_pending_candidates,
        );
        report.pruned = stats.pruned;
        report.capped = stats.capped;
        report.total_candidates = candidates.len();

        self.store.write_all(&candidates)?;

        info!(
            new_candidates = report.new_candidates.len(),
            errors = report.errors.len(),
            pruned = report.pruned,
            capped = report.capped,
            total = report.total_candidates,
            "Collection complete"
        );
        Ok(report)
    }

    async fn list_source(
        &self,
        source: &SourceDescriptor,
        published_after: DateTime<Utc>,
    ) -> std::result::Result<Vec<ListedVideo>, SourceFailure> {
        if !source.platform.eq_ignore_ascii_case(SUPPORTED_PLATFORM) {
            return Err(SourceFailure {
                source: source.name.clone(),
                message: format!("unsupported platform: {}", source.platform),
                quota_or_auth: false,
            });
        }

        self.videos
            .list_recent(&source.external_id, published_after, LIST_LIMIT)
            .await
            .map_err(|e| SourceFailure {
                source: source.name.clone(),
                quota_or_auth: matches!(e, VideoSourceError::QuotaOrAuth(_)),
                message: e.to_string(),
            })
    }
}

fn snapshot(video: ListedVideo) -> VideoSnapshot {
    VideoSnapshot {
        video_id: video.video_id,
        title: video.title,
        description: video.description,
        url: video.url,
        published_at: video.published_at,
        thumbnail_url: video.thumbnail_url,
    }
}

/// Drop terminal candidates not updated within `retention`, then keep only
/// the `max_pending` most recently created pending candidates. Survivors
/// keep their relative order.
pub fn apply_retention(
    candidates: Vec<Candidate>,
    now: DateTime<Utc>,
    retention: Duration,
    max_pending: usize,
) -> (Vec<Candidate>, RetentionStats) {
    let cutoff = now - retention;
    let before = candidates.len();

    let kept: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| !(c.status.is_terminal() && c.updated_at < cutoff))
        .collect();
    let pruned = before - kept.len();

    let mut pending: Vec<(usize, DateTime<Utc>)> = kept
        .iter()
        .enumerate()
        .filter(|(_, c)| c.status.is_pending())
        .map(|(idx, c)| (idx, c.created_at))
        .collect();

    let excess = pending.len().saturating_sub(max_pending);
    if excess == 0 {
        return (kept, RetentionStats { pruned, capped: 0 });
    }

    // Oldest first; equal timestamps drop the earlier array entry first.
    pending.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
    let dropped: HashSet<usize> = pending.iter().take(excess).map(|(idx, _)| *idx).collect();

    let kept = kept
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| !dropped.contains(idx))
        .map(|(_, c)| c)
        .collect();

    (
        kept,
        RetentionStats {
            pruned,
            capped: excess,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::MockVideoSource;
    use crate::models::CandidateStatus;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap()
    }

    fn source(name: &str, channel: &str) -> SourceDescriptor {
        SourceDescriptor {
            name: name.into(),
            platform: "youtube".into(),
            external_id: channel.into(),
            focus: vec![],
        }
    }

    fn listed(id: &str, hours_ago: i64) -> ListedVideo {
        ListedVideo {
            video_id: id.into(),
            title: format!("Video {id}"),
            description: String::new(),
            url: format!("https://www.youtube.com/watch?v={id}"),
            published_at: now() - Duration::hours(hours_ago),
            thumbnail_url: None,
        }
    }

    fn candidate(id: &str, status: CandidateStatus, created: DateTime<Utc>) -> Candidate {
        let video = VideoSnapshot {
            video_id: id.into(),
            title: id.into(),
            description: String::new(),
            url: String::new(),
            published_at: created,
            thumbnail_url: None,
        };
        let mut c = Candidate::collected(source("S", "UC1"), video, created);
        c.status = status;
        c
    }

    fn collector(dir: &tempfile::TempDir, videos: MockVideoSource) -> Collector {
        Collector::new(
            Settings::default(),
            CandidateStore::new(dir.path().join("candidates.json")),
            Arc::new(videos),
        )
    }

    #[tokio::test]
    async fn test_collects_newest_first_skipping_known_ids() {
        let dir = tempfile::tempdir().unwrap();
        let videos = MockVideoSource::new().with_videos(
            "UC1",
            vec![listed("old", 100), listed("a", 1), listed("b", 5), listed("c", 10), listed("d", 20)],
        );
        let collector = collector(&dir, videos);
        collector
            .store
            .write_all(&[candidate("b", CandidateStatus::Collected, now())])
            .unwrap();

        let report = collector.collect(&[source("Tech", "UC1")], now()).await.unwrap();

        assert_eq!(report.new_candidates, vec!["yt-a", "yt-c", "yt-d"]);
        let ids: Vec<_> = collector.store.read_all().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["yt-b", "yt-a", "yt-c", "yt-d"]);
        assert_eq!(report.total_candidates, 4);
    }

    #[tokio::test]
    async fn test_next_run_reaches_videos_behind_known_ones() {
        let dir = tempfile::tempdir().unwrap();
        let videos = MockVideoSource::new().with_videos(
            "UC1",
            vec![listed("a", 1), listed("b", 5), listed("c", 10), listed("d", 20)],
        );
        let collector = collector(&dir, videos);
        let sources = [source("Tech", "UC1")];

        let first = collector.collect(&sources, now()).await.unwrap();
        assert_eq!(first.new_candidates, vec!["yt-a", "yt-b", "yt-c"]);

        let second = collector.collect(&sources, now()).await.unwrap();
        assert_eq!(second.new_candidates, vec!["yt-d"]);
        assert_eq!(second.total_candidates, 4);

        let third = collector.collect(&sources, now()).await.unwrap();
        assert!(third.new_candidates.is_empty());
    }

    #[tokio::test]
    async fn test_no_sources_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = collector(&dir, MockVideoSource::new())
            .collect(&[], now())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NoSources));
    }

    #[tokio::test]
    async fn test_all_sources_failing_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let videos = MockVideoSource::new()
            .failing_channel("UC1", "connection reset")
            .quota_exceeded("UC2");
        let err = collector(&dir, videos)
            .collect(&[source("A", "UC1"), source("B", "UC2")], now())
            .await
            .unwrap_err();
        match err {
            PipelineError::AllSourcesFailed { count, messages } => {
                assert_eq!(count, 2);
                assert!(messages[0].contains("connection reset"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_partial_failure_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let videos = MockVideoSource::new()
            .quota_exceeded("UC1")
            .with_videos("UC2", vec![listed("z", 2)]);
        let report = collector(&dir, videos)
            .collect(&[source("A", "UC1"), source("B", "UC2")], now())
            .await
            .unwrap();

        assert_eq!(report.new_candidates, vec!["yt-z"]);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].quota_or_auth);
        assert_eq!(report.errors[0].source, "A");
    }

    #[test]
    fn test_retention_prunes_stale_terminal_only() {
        let stale = now() - Duration::days(20);
        let mut old_published = candidate("p", CandidateStatus::Published, stale);
        old_published.updated_at = stale;
        let mut fresh_failed = candidate("f", CandidateStatus::Failed, stale);
        fresh_failed.updated_at = now() - Duration::days(1);
        let old_collected = candidate("c", CandidateStatus::Collected, stale);

        let (kept, stats) = apply_retention(
            vec![old_published, fresh_failed, old_collected],
            now(),
            Duration::days(14),
            30,
        );
        assert_eq!(stats, RetentionStats { pruned: 1, capped: 0 });
        let ids: Vec<_> = kept.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["yt-f", "yt-c"]);
    }

    #[test]
    fn test_cap_keeps_most_recent_pending_in_order() {
        // 40 pending candidates in shuffled creation order
        let candidates: Vec<Candidate> = (0..40)
            .map(|i| {
                let hours = (i * 7) % 40;
                let status = if i % 2 == 0 {
                    CandidateStatus::Collected
                } else {
                    CandidateStatus::Researched
                };
                candidate(&format!("v{hours}"), status, now() - Duration::hours(hours))
            })
            .collect();
        let generated = candidate("g", CandidateStatus::Generated, now() - Duration::days(30));
        let mut all = candidates.clone();
        all.push(generated);

        let (kept, stats) = apply_retention(all, now(), Duration::days(14), 30);
        assert_eq!(stats.capped, 10);
        assert_eq!(kept.len(), 31);
        assert!(kept.iter().any(|c| c.id == "yt-g"));

        let survivors: Vec<_> = kept.iter().filter(|c| c.status.is_pending()).collect();
        assert_eq!(survivors.len(), 30);
        assert!(survivors
            .iter()
            .all(|c| c.created_at > now() - Duration::hours(30)));

        let expected: Vec<_> = candidates
            .iter()
            .filter(|c| c.created_at > now() - Duration::hours(30))
            .map(|c| c.id.clone())
            .collect();
        let actual: Vec<_> = survivors.iter().map(|c| c.id.clone()).collect();
        assert_eq!(actual, expected);
    }
}
