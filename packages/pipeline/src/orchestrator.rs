//! Runs the stages in order: collect, research, generate, publish.
//!
//! Every stage entry point here also writes that stage's dated snapshot, so
//! the CLI can run one stage at a time and a later `publish` can pick up the
//! last generator result. A stage that fails, alone or inside `run`, leaves a
//! `failed` status document behind.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::config::{Catalogs, Settings};
use crate::error::Result;
use crate::kernel::PipelineDeps;
use crate::models::CandidateStatus;
use crate::snapshot::{PipelineStatus, RunResults, SnapshotWriter, Stage};
use crate::stages::{
    Collector, CollectorReport, GeneratorOutcome, Generator, GeneratedArticle, Publisher,
    PublisherReport, Researcher, ResearcherReport, ValidationReport,
};
use crate::store::{CandidateStore, PostIndex, TopicHistory};

pub struct Pipeline {
    settings: Settings,
    catalogs: Catalogs,
    deps: PipelineDeps,
    store: CandidateStore,
    posts: PostIndex,
    history: TopicHistory,
    snapshots: SnapshotWriter,
}

impl Pipeline {
    pub fn new(settings: Settings, catalogs: Catalogs, deps: PipelineDeps) -> Self {
        Self {
            store: CandidateStore::new(settings.candidates_path()),
            posts: PostIndex::new(settings.posts_path()),
            history: TopicHistory::new(settings.topic_history_path()),
            snapshots: SnapshotWriter::new(&settings.data_dir),
            settings,
            catalogs,
            deps,
        }
    }

    pub fn store(&self) -> &CandidateStore {
        &self.store
    }

    pub fn posts(&self) -> &PostIndex {
        &self.posts
    }

    pub fn snapshots(&self) -> &SnapshotWriter {
        &self.snapshots
    }

    // =========================================================================
    // Single stages
    // =========================================================================

    pub async fn collect(&self, now: DateTime<Utc>) -> Result<CollectorReport> {
        let result = self.run_collector(now).await;
        self.record_stage_failure(Stage::Collector, &result, now);
        result
    }

    pub async fn research(&self, now: DateTime<Utc>) -> Result<ResearcherReport> {
        let result = self.run_researcher(now).await;
        self.record_stage_failure(Stage::Researcher, &result, now);
        result
    }

    pub async fn generate(&self, now: DateTime<Utc>) -> Result<GeneratorOutcome> {
        let result = self.run_generator(now).await;
        self.record_stage_failure(Stage::Generator, &result, now);
        result
    }

    /// Standalone publish: takes the most recent generator snapshot and
    /// finalizes with a status document.
    pub fn publish(&self, now: DateTime<Utc>) -> Result<PipelineStatus> {
        let mut results = RunResults::default();
        let result = self.run_publisher(&mut results, now);
        if let Err(e) = &result {
            error!(stage = %Stage::Publisher, error = %e, "Stage failed");
            self.publisher().record_failure(&results, &e.to_string(), now);
        }
        result
    }

    fn record_stage_failure<T>(&self, stage: Stage, result: &Result<T>, now: DateTime<Utc>) {
        if let Err(e) = result {
            error!(stage = %stage, error = %e, "Stage failed");
            self.publisher()
                .record_failure(&RunResults::default(), &e.to_string(), now);
        }
    }

    async fn run_collector(&self, now: DateTime<Utc>) -> Result<CollectorReport> {
        let collector = Collector::new(
            self.settings.clone(),
            self.store.clone(),
            self.deps.require_videos()?,
        );
        let report = collector.collect(&self.catalogs.sources, now).await?;
        self.snapshots.write_stage(Stage::Collector, now, &report)?;
        Ok(report)
    }

    async fn run_researcher(&self, now: DateTime<Utc>) -> Result<ResearcherReport> {
        let researcher = Researcher::new(
            self.settings.clone(),
            self.store.clone(),
            self.deps.require_ai()?,
            self.deps.require_search()?,
            self.deps.require_fetcher()?,
        );
        let report = researcher.research(now).await?;
        self.snapshots.write_stage(Stage::Researcher, now, &report)?;
        Ok(report)
    }

    async fn run_generator(&self, now: DateTime<Utc>) -> Result<GeneratorOutcome> {
        let generator = Generator::new(
            self.settings.clone(),
            self.catalogs.clone(),
            self.store.clone(),
            self.posts.clone(),
            self.history.clone(),
            self.deps.require_ai()?,
        );
        let outcome = generator.generate(now).await?;
        self.snapshots.write_stage(Stage::Generator, now, &outcome)?;
        Ok(outcome)
    }

    /// Publish `article` (or record that there was nothing) and snapshot the report.
    fn publish_article(
        &self,
        article: Option<&GeneratedArticle>,
        now: DateTime<Utc>,
    ) -> Result<PublisherReport> {
        let report = self.publisher().publish(article, now)?;
        self.snapshots.write_stage(Stage::Publisher, now, &report)?;
        Ok(report)
    }

    fn run_publisher(&self, results: &mut RunResults, now: DateTime<Utc>) -> Result<PipelineStatus> {
        results.generator = self.snapshots.latest_stage(Stage::Generator)?;
        let article = results.generator.as_ref().and_then(GeneratorOutcome::article);
        let report = self.publish_article(article, now)?;
        results.publisher = Some(report);
        self.publisher().finalize(results, now)
    }

    pub fn validate(&self) -> Result<ValidationReport> {
        self.publisher().validate()
    }

    fn publisher(&self) -> Publisher {
        Publisher::new(
            self.settings.clone(),
            self.store.clone(),
            self.posts.clone(),
            self.snapshots.clone(),
        )
    }

    // =========================================================================
    // Full run
    // =========================================================================

    /// Run every stage. On error a failure status is written before the
    /// error is returned.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<PipelineStatus> {
        let mut results = RunResults::default();
        match self.run_stages(&mut results, now).await {
            Ok(status) => Ok(status),
            Err(e) => {
                error!(error = %e, "Pipeline run failed");
                self.publisher().record_failure(&results, &e.to_string(), now);
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        results: &mut RunResults,
        now: DateTime<Utc>,
    ) -> Result<PipelineStatus> {
        results.collector = Some(self.run_collector(now).await?);
        results.researcher = Some(self.run_researcher(now).await?);

        if self.store.find_by_status(CandidateStatus::Researched).is_empty() {
            info!("No researched candidates, skipping generation");
        } else {
            results.generator = Some(self.run_generator(now).await?);
        }

        let article = results.generator.as_ref().and_then(GeneratorOutcome::article);
        let report = self.publish_article(article, now)?;
        results.publisher = Some(report);

        let status = self.publisher().finalize(results, now)?;
        info!(status = ?status.status, generated_file = ?status.generated_file, "Pipeline run finished");
        Ok(status)
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Candidate count per status, every status listed.
    pub fn status_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts: BTreeMap<&'static str, usize> = CandidateStatus::ALL
            .iter()
            .map(|status| (status.as_str(), 0))
            .collect();
        for candidate in self.store.read_all() {
            *counts.entry(candidate.status.as_str()).or_default() += 1;
        }
        counts
    }

    pub fn last_status(&self) -> Result<Option<PipelineStatus>> {
        self.snapshots.read_status()
    }
}
