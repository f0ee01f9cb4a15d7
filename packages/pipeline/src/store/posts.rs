use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::PostRecord;

use super::{read_json_or_default, write_json_atomic};

/// What an upsert did to the post list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostUpsert {
    /// A record with this url did not exist before.
    pub inserted: bool,
    /// The list on disk differs from before the upsert.
    pub changed: bool,
    pub total: usize,
}

/// Public post list (`posts.json`), kept sorted newest first.
#[derive(Debug, Clone)]
pub struct PostIndex {
    path: PathBuf,
}

impl PostIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_all(&self) -> Vec<PostRecord> {
        read_json_or_default(&self.path)
    }

    /// Replace the record with the same `url` or append, then re-sort and
    /// persist. An identical record leaves the file untouched.
    pub fn upsert(&self, post: PostRecord) -> Result<PostUpsert> {
        let before = self.read_all();
        let mut posts = before.clone();

        let inserted = match posts.iter_mut().find(|p| p.url == post.url) {
            Some(existing) => {
                *existing = post;
                false
            }
            None => {
                posts.push(post);
                true
            }
        };
        posts.sort_by(PostRecord::display_order);

        let changed = posts != before;
        if changed {
            write_json_atomic(&self.path, &posts)?;
        }

        Ok(PostUpsert {
            inserted,
            changed,
            total: posts.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn post(slug: &str, day: u32, title: &str) -> PostRecord {
        PostRecord {
            title: title.to_string(),
            date: Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap(),
            summary: "summary".into(),
            tags: vec!["AI".into()],
            url: format!("posts/{slug}.html"),
            slug: slug.to_string(),
            image: "/images/a.jpg".into(),
            topic_key: None,
        }
    }

    #[test]
    fn test_upsert_appends_then_replaces_by_url() {
        let dir = tempfile::tempdir().unwrap();
        let index = PostIndex::new(dir.path().join("posts.json"));

        let first = index.upsert(post("a", 1, "A")).unwrap();
        assert!(first.inserted && first.changed);

        index.upsert(post("b", 2, "B")).unwrap();
        let replaced = index.upsert(post("a", 1, "A revised")).unwrap();
        assert!(!replaced.inserted);
        assert!(replaced.changed);
        assert_eq!(replaced.total, 2);

        let posts = index.read_all();
        assert_eq!(posts[0].slug, "b");
        assert_eq!(posts[1].title, "A revised");
    }

    #[test]
    fn test_identical_upsert_does_not_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let index = PostIndex::new(dir.path().join("posts.json"));
        index.upsert(post("a", 1, "A")).unwrap();
        let modified = std::fs::metadata(index.path()).unwrap().modified().unwrap();

        let again = index.upsert(post("a", 1, "A")).unwrap();
        assert!(!again.changed);
        assert_eq!(
            std::fs::metadata(index.path()).unwrap().modified().unwrap(),
            modified
        );
    }
}
