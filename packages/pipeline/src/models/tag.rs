use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::text::slugify;

/// Category given to tags that are not in the dictionary.
pub const UNCATEGORIZED: &str = "general";

/// A tag as it arrives from a draft (plain string) or after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tag {
    Normalized(NormalizedTag),
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTag {
    pub slug: String,
    pub label: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

/// Dictionary entry: canonical tag plus the spellings that map to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagDefinition {
    pub slug: String,
    pub label: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

fn default_category() -> String {
    UNCATEGORIZED.to_string()
}

impl TagDefinition {
    fn matches(&self, raw: &str) -> bool {
        let raw = raw.trim();
        self.slug.eq_ignore_ascii_case(raw)
            || self.label.eq_ignore_ascii_case(raw)
            || self.aliases.iter().any(|a| a.trim().eq_ignore_ascii_case(raw))
    }

    fn to_tag(&self) -> NormalizedTag {
        NormalizedTag {
            slug: self.slug.clone(),
            label: self.label.clone(),
            category: self.category.clone(),
            style: self.style.clone(),
        }
    }
}

/// Configured tag vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagDictionary {
    pub entries: Vec<TagDefinition>,
}

impl TagDictionary {
    pub fn new(entries: Vec<TagDefinition>) -> Self {
        Self { entries }
    }

    /// Normalize one tag. Dictionary hits (slug, label or alias, case
    /// insensitive) win; anything else is slugified into an ad-hoc tag.
    /// Returns `None` for tags with no usable characters.
    pub fn normalize(&self, tag: &Tag) -> Option<NormalizedTag> {
        let raw = match tag {
            Tag::Normalized(t) => return Some(t.clone()).filter(|t| !t.slug.is_empty()),
            Tag::Raw(raw) => raw.trim(),
        };

        if let Some(definition) = self.entries.iter().find(|d| d.matches(raw)) {
            return Some(definition.to_tag());
        }

        let slug = slugify(raw);
        if slug.is_empty() {
            return None;
        }
        if let Some(definition) = self.entries.iter().find(|d| d.slug == slug) {
            return Some(definition.to_tag());
        }

        Some(NormalizedTag {
            slug,
            label: raw.to_string(),
            category: UNCATEGORIZED.to_string(),
            style: None,
        })
    }

    /// Normalize a list, keeping the first tag for each slug.
    pub fn normalize_all(&self, tags: &[Tag]) -> Vec<NormalizedTag> {
        let mut seen = HashSet::new();
        tags.iter()
            .filter_map(|t| self.normalize(t))
            .filter(|t| seen.insert(t.slug.clone()))
            .collect()
    }
}
