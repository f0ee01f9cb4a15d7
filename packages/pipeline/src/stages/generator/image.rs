//! Deterministic illustrative image choice.
//!
//! The same seed and pool always give the same image, so regenerating an
//! article never swaps its picture.

use std::collections::HashSet;

use crate::models::{ImageAsset, ImageCatalog, NormalizedTag};

/// Java-style string hash over UTF-16 code units: `h = h * 31 + unit`,
/// wrapping at 32 bits and read as signed.
pub fn string_hash(seed: &str) -> i32 {
    seed.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// First non-empty of topic key, slug, title, id.
pub fn image_seed<'a>(
    topic_key: Option<&'a str>,
    slug: Option<&'a str>,
    title: Option<&'a str>,
    id: &'a str,
) -> &'a str {
    [topic_key, slug, title]
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
        .unwrap_or(id)
}

/// Pick an image for an article.
///
/// The pool is every image whose topics or category match a tag slug, a tag
/// category or a word of the topic key. An empty match falls back to the
/// whole catalog, an empty catalog to its default image.
pub fn select_image(
    catalog: &ImageCatalog,
    seed: &str,
    tags: &[NormalizedTag],
    topic_key: Option<&str>,
) -> ImageAsset {
    let mut keys: HashSet<String> = HashSet::new();
    for tag in tags {
        keys.insert(tag.slug.to_lowercase());
        keys.insert(tag.category.to_lowercase());
    }
    if let Some(topic_key) = topic_key {
        keys.extend(
            topic_key
                .split('-')
                .filter(|w| !w.is_empty())
                .map(str::to_lowercase),
        );
    }

    let matching: Vec<&ImageAsset> = catalog
        .images
        .iter()
        .filter(|image| {
            image
                .topics
                .iter()
                .chain(image.category.as_ref())
                .any(|t| keys.contains(&t.to_lowercase()))
        })
        .collect();

    let pool: Vec<&ImageAsset> = if matching.is_empty() {
        catalog.images.iter().collect()
    } else {
        matching
    };

    if pool.is_empty() {
        return catalog.default_or_fallback();
    }

    let index = string_hash(seed).unsigned_abs() as usize % pool.len();
    pool[index].clone()
}
