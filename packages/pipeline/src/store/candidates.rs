use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::models::{Candidate, CandidateStatus};

use super::{merge_patch, read_json_or_default, write_json_atomic};

/// Fields a merge patch may not touch; status only moves through
/// `Candidate::transition`.
const PROTECTED_FIELDS: [&str; 2] = ["id", "status"];

type Replacement = Box<dyn FnOnce(Candidate) -> Result<Candidate> + Send>;

/// How `update_by_id` changes a candidate.
pub enum CandidateUpdate {
    /// JSON merge patch over the candidate's camelCase form.
    Merge(serde_json::Value),
    /// Replacement function receiving the current record. An error aborts
    /// the update without writing.
    Replace(Replacement),
}

impl CandidateUpdate {
    pub fn replace(f: impl FnOnce(Candidate) -> Result<Candidate> + Send + 'static) -> Self {
        Self::Replace(Box::new(f))
    }
}

/// The candidate array, stored as one JSON file.
#[derive(Debug, Clone)]
pub struct CandidateStore {
    path: PathBuf,
}

impl CandidateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All candidates in store order; empty when the file is absent or unreadable.
    pub fn read_all(&self) -> Vec<Candidate> {
        read_json_or_default(&self.path)
    }

    pub fn write_all(&self, candidates: &[Candidate]) -> Result<()> {
        write_json_atomic(&self.path, candidates)
    }

    pub fn find_by_status(&self, status: CandidateStatus) -> Vec<Candidate> {
        self.read_all()
            .into_iter()
            .filter(|c| c.status == status)
            .collect()
    }

    pub fn find_by_id(&self, id: &str) -> Option<Candidate> {
        self.read_all().into_iter().find(|c| c.id == id)
    }

    /// Apply `update` to the candidate with `id` and rewrite the file.
    /// Returns `false` (and writes nothing) when no candidate has that id.
    pub fn update_by_id(&self, id: &str, update: CandidateUpdate) -> Result<bool> {
        if let CandidateUpdate::Merge(patch) = &update {
            if let Some(field) = PROTECTED_FIELDS
                .into_iter()
                .find(|f| patch.get(*f).is_some())
            {
                return Err(PipelineError::ProtectedField {
                    id: id.to_string(),
                    field,
                });
            }
        }

        let mut candidates = self.read_all();
        let Some(index) = candidates.iter().position(|c| c.id == id) else {
            return Ok(false);
        };

        let current = candidates[index].clone();
        candidates[index] = match update {
            CandidateUpdate::Merge(patch) => {
                let mut value =
                    serde_json::to_value(&current).map_err(|e| PipelineError::json(&self.path, e))?;
                merge_patch(&mut value, &patch);
                serde_json::from_value(value).map_err(|e| PipelineError::json(&self.path, e))?
            }
            CandidateUpdate::Replace(f) => f(current)?,
        };

        self.write_all(&candidates)?;
        Ok(true)
    }
}
