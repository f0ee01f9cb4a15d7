//! Run snapshots.
//!
//! Each stage invocation leaves `<DATA_DIR>/output/<stage>-<YYYY-MM-DD>.json`
//! (later runs on the same day overwrite it). Every run ends by writing the
//! cumulative status document `<DATA_DIR>/pipeline-status.json`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::stages::{
    CollectorReport, GeneratorOutcome, GeneratorSummary, PublisherReport, ResearcherReport,
    ValidationReport,
};
use crate::store::{try_read_json, write_json_atomic};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Collector,
    Researcher,
    Generator,
    Publisher,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collector => "collector",
            Self::Researcher => "researcher",
            Self::Generator => "generator",
            Self::Publisher => "publisher",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// An article was published
    Success,
    /// The run finished without publishing anything
    Skipped,
    /// A stage raised an error
    Failed,
}

/// Stage results gathered during one run; any may be missing when a run
/// stops early or a single stage is invoked.
#[derive(Debug, Clone, Default)]
pub struct RunResults {
    pub collector: Option<CollectorReport>,
    pub researcher: Option<ResearcherReport>,
    pub generator: Option<GeneratorOutcome>,
    pub publisher: Option<PublisherReport>,
}

/// The cumulative status document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatus {
    pub status: RunStatus,
    pub generated_file: Option<String>,
    pub executed_at: DateTime<Utc>,
    pub collector: Option<CollectorReport>,
    pub researcher: Option<ResearcherReport>,
    pub generator: Option<GeneratorSummary>,
    pub publisher: Option<PublisherReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineStatus {
    /// Status for a run that reached the end.
    pub fn completed(
        results: &RunResults,
        validation: Option<ValidationReport>,
        now: DateTime<Utc>,
    ) -> Self {
        let generated_file = results
            .publisher
            .as_ref()
            .and_then(|p| p.output_file.clone());
        let status = if generated_file.is_some() {
            RunStatus::Success
        } else {
            RunStatus::Skipped
        };

        Self {
            status,
            generated_file,
            executed_at: now,
            collector: results.collector.clone(),
            researcher: results.researcher.clone(),
            generator: results.generator.as_ref().map(GeneratorOutcome::summary),
            publisher: results.publisher.clone(),
            validation,
            error: None,
        }
    }

    /// Status for a run aborted by `error`, keeping whatever finished.
    pub fn failed(results: &RunResults, error: &str, now: DateTime<Utc>) -> Self {
        Self {
            status: RunStatus::Failed,
            generated_file: None,
            executed_at: now,
            collector: results.collector.clone(),
            researcher: results.researcher.clone(),
            generator: results.generator.as_ref().map(GeneratorOutcome::summary),
            publisher: results.publisher.clone(),
            validation: None,
            error: Some(error.to_string()),
        }
    }
}

/// Reads and writes snapshots under the data directory.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    data_dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.data_dir.join("output")
    }

    pub fn status_path(&self) -> PathBuf {
        self.data_dir.join("pipeline-status.json")
    }

    pub fn stage_path(&self, stage: Stage, date: DateTime<Utc>) -> PathBuf {
        self.output_dir()
            .join(format!("{}-{}.json", stage, date.format("%Y-%m-%d")))
    }

    pub fn write_stage<T: Serialize>(&self, stage: Stage, now: DateTime<Utc>, value: &T) -> Result<PathBuf> {
        let path = self.stage_path(stage, now);
        write_json_atomic(&path, value)?;
        tracing::debug!(stage = %stage, path = %path.display(), "Stage snapshot written");
        Ok(path)
    }

    /// The most recent snapshot for `stage`, by the date in its file name.
    pub fn latest_stage<T: DeserializeOwned>(&self, stage: Stage) -> Result<Option<T>> {
        let Some(path) = self.latest_stage_path(stage)? else {
            return Ok(None);
        };
        try_read_json(&path)
    }

    fn latest_stage_path(&self, stage: Stage) -> Result<Option<PathBuf>> {
        let dir = self.output_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PipelineError::io(&dir, e)),
        };

        let prefix = format!("{stage}-");
        let mut latest: Option<PathBuf> = None;
        for entry in entries {
            let path = entry.map_err(|e| PipelineError::io(&dir, e))?.path();
            let is_match = file_name(&path)
                .is_some_and(|name| name.starts_with(&prefix) && name.ends_with(".json"));
            if is_match && latest.as_ref().map_or(true, |l| file_name(&path) > file_name(l)) {
                latest = Some(path);
            }
        }
        Ok(latest)
    }

    pub fn write_status(&self, status: &PipelineStatus) -> Result<()> {
        write_json_atomic(&self.status_path(), status)
    }

    pub fn read_status(&self) -> Result<Option<PipelineStatus>> {
        try_read_json(&self.status_path())
    }
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}
