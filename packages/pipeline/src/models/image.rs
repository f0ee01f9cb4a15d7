use serde::{Deserialize, Serialize};

/// Used when the catalog has neither images nor a default.
pub const FALLBACK_IMAGE_URL: &str = "/images/default.jpg";

/// One illustrative image available to articles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAsset {
    pub url: String,
    #[serde(default)]
    pub alt: String,
    /// Tag slugs or topic words this image suits.
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ImageAsset {
    pub fn fallback() -> Self {
        Self {
            url: FALLBACK_IMAGE_URL.to_string(),
            alt: String::new(),
            topics: Vec::new(),
            category: None,
        }
    }
}

/// Image pool file: candidate images plus the default used when the pool is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageCatalog {
    #[serde(default)]
    pub images: Vec<ImageAsset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_image: Option<ImageAsset>,
}

impl ImageCatalog {
    pub fn default_or_fallback(&self) -> ImageAsset {
        self.default_image.clone().unwrap_or_else(ImageAsset::fallback)
    }
}
