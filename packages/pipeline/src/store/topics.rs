use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::TopicHistoryEntry;

use super::{read_json_or_default, write_json_atomic};

/// Topic history (`topic-history.json`): one entry per topic key.
#[derive(Debug, Clone)]
pub struct TopicHistory {
    path: PathBuf,
}

impl TopicHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_all(&self) -> Vec<TopicHistoryEntry> {
        read_json_or_default(&self.path)
    }

    pub fn find(&self, topic_key: &str) -> Option<TopicHistoryEntry> {
        self.read_all()
            .into_iter()
            .find(|e| e.topic_key == topic_key)
    }

    /// Replace the entry for this topic key (keeping its `first_seen`) or append.
    pub fn upsert(&self, mut entry: TopicHistoryEntry) -> Result<()> {
        let mut entries = self.read_all();
        if let Some(previous) = entries.iter().find(|e| e.topic_key == entry.topic_key) {
            entry.first_seen = entry.first_seen.min(previous.first_seen);
        }
        entries.retain(|e| e.topic_key != entry.topic_key);
        entries.push(entry);
        write_json_atomic(&self.path, &entries)
    }
}
