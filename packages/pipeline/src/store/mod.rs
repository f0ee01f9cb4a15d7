//! Whole-file JSON stores.
//!
//! Every write replaces the file: the document is written to a sibling
//! `.tmp` file and renamed over the target. There is no locking; one
//! pipeline run at a time owns the data directory.

mod candidates;
mod posts;
mod topics;

pub use candidates::{CandidateStore, CandidateUpdate};
pub use posts::{PostIndex, PostUpsert};
pub use topics::TopicHistory;

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::{PipelineError, Result};

/// Read a JSON document, falling back to `T::default()` when the file is
/// missing or cannot be decoded.
pub fn read_json_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    match try_read_json(path) {
        Ok(Some(value)) => value,
        Ok(None) => T::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unreadable JSON document, using empty default");
            T::default()
        }
    }
}

/// Read a JSON document; `Ok(None)` when the file does not exist.
pub fn try_read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PipelineError::io(path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| PipelineError::json(path, e))
}

/// Pretty-print `value` to `path`, replacing the file in one rename.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut body = serde_json::to_vec_pretty(value).map_err(|e| PipelineError::json(path, e))?;
    body.push(b'\n');
    write_atomic(path, &body)
}

/// Replace `path` with `contents` via a sibling temp file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);

    fs::write(tmp, contents).map_err(|e| PipelineError::io(tmp, e))?;
    fs::rename(tmp, path).map_err(|e| PipelineError::io(path, e))
}

/// RFC 7396 JSON merge patch: objects merge recursively, `null` deletes,
/// everything else replaces.
pub fn merge_patch(target: &mut serde_json::Value, patch: &serde_json::Value) {
    use serde_json::Value;

    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Default::default());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge_patch(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_file_reads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let items: Vec<String> = read_json_or_default(&dir.path().join("absent.json"));
        assert!(items.is_empty());
    }

    #[test]
    fn test_corrupt_file_reads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, b"[{not json").unwrap();
        let items: Vec<String> = read_json_or_default(&path);
        assert!(items.is_empty());
        assert!(try_read_json::<Vec<String>>(&path).is_err());
    }

    #[test]
    fn test_atomic_write_creates_parents_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/data/items.json");
        write_json_atomic(&path, &vec!["a", "b"]).unwrap();

        let back: Vec<String> = read_json_or_default(&path);
        assert_eq!(back, vec!["a", "b"]);
        assert!(!dir.path().join("nested/data/items.json.tmp").exists());
    }

    #[test]
    fn test_merge_patch_semantics() {
        let mut doc = json!({"a": 1, "b": {"c": 2, "d": 3}, "e": [1, 2]});
        merge_patch(&mut doc, &json!({"a": 9, "b": {"c": null, "x": 1}, "e": [3]}));
        assert_eq!(doc, json!({"a": 9, "b": {"d": 3, "x": 1}, "e": [3]}));
    }
}
