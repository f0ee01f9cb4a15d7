use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use secrecy::SecretString;
use serde::de::DeserializeOwned;

use crate::error::PipelineError;
use crate::models::{ImageCatalog, SourceDescriptor, TagDictionary};
use crate::store;

/// Application configuration loaded from environment variables
#[derive(Debug)]
pub struct Config {
    pub credentials: Credentials,
    pub settings: Settings,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let lookup = |key: &str| env::var(key).ok();
        Ok(Self {
            credentials: Credentials::from_lookup(lookup),
            settings: Settings::from_lookup(lookup)?,
        })
    }
}

/// API keys. Each stage asks only for the ones it uses.
#[derive(Debug, Default)]
pub struct Credentials {
    pub openai_api_key: Option<SecretString>,
    pub youtube_api_key: Option<SecretString>,
    pub google_search_api_key: Option<SecretString>,
    pub google_search_engine_id: Option<String>,
    pub tavily_api_key: Option<SecretString>,
}

impl Credentials {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let secret = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from)
        };
        Self {
            openai_api_key: secret("OPENAI_API_KEY"),
            youtube_api_key: secret("YOUTUBE_API_KEY"),
            google_search_api_key: secret("GOOGLE_SEARCH_API_KEY"),
            google_search_engine_id: lookup("GOOGLE_SEARCH_ENGINE_ID")
                .filter(|v| !v.trim().is_empty()),
            tavily_api_key: secret("TAVILY_API_KEY"),
        }
    }

    pub fn require_openai(&self) -> Result<&SecretString, PipelineError> {
        self.openai_api_key
            .as_ref()
            .ok_or(PipelineError::MissingCredential("OPENAI_API_KEY"))
    }

    pub fn require_youtube(&self) -> Result<&SecretString, PipelineError> {
        self.youtube_api_key
            .as_ref()
            .ok_or(PipelineError::MissingCredential("YOUTUBE_API_KEY"))
    }

    /// Google Custom Search when both halves are present, else Tavily.
    pub fn require_search(&self) -> Result<SearchCredentials<'_>, PipelineError> {
        match (
            &self.google_search_api_key,
            &self.google_search_engine_id,
            &self.tavily_api_key,
        ) {
            (Some(api_key), Some(engine_id), _) => Ok(SearchCredentials::Google {
                api_key,
                engine_id,
            }),
            (_, _, Some(api_key)) => Ok(SearchCredentials::Tavily { api_key }),
            (Some(_), None, None) => Err(PipelineError::MissingCredential(
                "GOOGLE_SEARCH_ENGINE_ID",
            )),
            _ => Err(PipelineError::MissingCredential("GOOGLE_SEARCH_API_KEY")),
        }
    }
}

/// Which web search provider to build.
#[derive(Debug)]
pub enum SearchCredentials<'a> {
    Google {
        api_key: &'a SecretString,
        engine_id: &'a str,
    },
    Tavily {
        api_key: &'a SecretString,
    },
}

/// Tuning knobs and file locations. Built once, shared read-only by every stage.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub site_dir: PathBuf,
    pub sources_file: PathBuf,
    pub tags_file: PathBuf,
    pub images_file: PathBuf,
    pub template_file: Option<PathBuf>,

    pub collect_lookback_days: i64,
    pub max_videos_per_source: usize,
    pub cleanup_retention_days: i64,
    pub max_pending_candidates: usize,
    pub dedupe_window_days: i64,

    pub search_results: usize,
    pub search_fetch_count: usize,
    pub fetch_timeout: Duration,
    pub page_text_max_chars: usize,
    pub summary_min_chars: usize,
    pub summary_max_chars: usize,
    pub request_delay: Duration,

    pub query_model: String,
    pub summary_model: String,
    pub article_model: String,

    pub validate_output: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            site_dir: PathBuf::from("site"),
            sources_file: PathBuf::from("config/sources.json"),
            tags_file: PathBuf::from("config/tags.json"),
            images_file: PathBuf::from("config/images.json"),
            template_file: None,
            collect_lookback_days: 3,
            max_videos_per_source: 3,
            cleanup_retention_days: 14,
            max_pending_candidates: 30,
            dedupe_window_days: 5,
            search_results: 3,
            search_fetch_count: 8,
            fetch_timeout: Duration::from_secs(10),
            page_text_max_chars: 6000,
            summary_min_chars: 120,
            summary_max_chars: 400,
            request_delay: Duration::from_millis(1000),
            query_model: "gpt-4o-mini".to_string(),
            summary_model: "gpt-4o-mini".to_string(),
            article_model: "gpt-4o".to_string(),
            validate_output: true,
        }
    }
}

impl Settings {
    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let path = |key: &str, default: PathBuf| lookup(key).map(PathBuf::from).unwrap_or(default);

        Ok(Self {
            data_dir: path("DATA_DIR", defaults.data_dir),
            site_dir: path("SITE_DIR", defaults.site_dir),
            sources_file: path("SOURCES_FILE", defaults.sources_file),
            tags_file: path("TAGS_FILE", defaults.tags_file),
            images_file: path("IMAGES_FILE", defaults.images_file),
            template_file: lookup("TEMPLATE_FILE").map(PathBuf::from),
            collect_lookback_days: parse_days(&lookup, "COLLECT_LOOKBACK_DAYS", defaults.collect_lookback_days)?,
            max_videos_per_source: parse_var(&lookup, "MAX_VIDEOS_PER_SOURCE", defaults.max_videos_per_source)?,
            cleanup_retention_days: parse_days(&lookup, "CLEANUP_RETENTION_DAYS", defaults.cleanup_retention_days)?,
            max_pending_candidates: parse_var(&lookup, "MAX_PENDING_CANDIDATES", defaults.max_pending_candidates)?,
            dedupe_window_days: parse_days(&lookup, "DEDUPE_WINDOW_DAYS", defaults.dedupe_window_days)?,
            search_results: parse_var(&lookup, "SEARCH_RESULTS", defaults.search_results)?,
            search_fetch_count: parse_var(&lookup, "SEARCH_FETCH_COUNT", defaults.search_fetch_count)?,
            fetch_timeout: Duration::from_secs(parse_var(
                &lookup,
                "FETCH_TIMEOUT_SECS",
                defaults.fetch_timeout.as_secs(),
            )?),
            page_text_max_chars: parse_var(&lookup, "PAGE_TEXT_MAX_CHARS", defaults.page_text_max_chars)?,
            summary_min_chars: parse_var(&lookup, "SUMMARY_MIN_CHARS", defaults.summary_min_chars)?,
            summary_max_chars: parse_var(&lookup, "SUMMARY_MAX_CHARS", defaults.summary_max_chars)?,
            request_delay: Duration::from_millis(parse_var(
                &lookup,
                "REQUEST_DELAY_MS",
                defaults.request_delay.as_millis() as u64,
            )?),
            query_model: lookup("QUERY_MODEL").unwrap_or(defaults.query_model),
            summary_model: lookup("SUMMARY_MODEL").unwrap_or(defaults.summary_model),
            article_model: lookup("ARTICLE_MODEL").unwrap_or(defaults.article_model),
            validate_output: parse_var(&lookup, "VALIDATE_OUTPUT", defaults.validate_output)?,
        })
    }

    pub fn candidates_path(&self) -> PathBuf {
        self.data_dir.join("candidates.json")
    }

    pub fn topic_history_path(&self) -> PathBuf {
        self.data_dir.join("topic-history.json")
    }

    pub fn posts_path(&self) -> PathBuf {
        self.site_dir.join("posts.json")
    }

    pub fn posts_dir(&self) -> PathBuf {
        self.site_dir.join("posts")
    }

    pub fn lookback(&self) -> chrono::Duration {
        days(self.collect_lookback_days)
    }

    pub fn retention(&self) -> chrono::Duration {
        days(self.cleanup_retention_days)
    }

    pub fn dedupe_window(&self) -> chrono::Duration {
        days(self.dedupe_window_days)
    }
}

/// Longest accepted day window (about a century).
pub const MAX_DAYS: i64 = 36_500;

fn days(value: i64) -> chrono::Duration {
    chrono::Duration::days(value.clamp(0, MAX_DAYS))
}

fn parse_days(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: i64) -> Result<i64> {
    let value: i64 = parse_var(lookup, key, default)?;
    if !(0..=MAX_DAYS).contains(&value) || chrono::Duration::try_days(value).is_none() {
        anyhow::bail!("{key} must be between 0 and {MAX_DAYS} days, got {value}");
    }
    Ok(value)
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a valid {}", std::any::type_name::<T>())),
        _ => Ok(default),
    }
}

/// Catalog files read at startup: sources, tag dictionary, image pool and
/// an optional HTML template override.
#[derive(Debug, Clone, Default)]
pub struct Catalogs {
    pub sources: Vec<SourceDescriptor>,
    pub tags: TagDictionary,
    pub images: ImageCatalog,
    pub template: Option<String>,
}

impl Catalogs {
    /// Missing catalog files load as empty; malformed ones are errors.
    pub fn load(settings: &Settings) -> Result<Self, PipelineError> {
        let template = match &settings.template_file {
            Some(path) => Some(
                std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?,
            ),
            None => None,
        };

        Ok(Self {
            sources: load_catalog(&settings.sources_file)?,
            tags: load_catalog(&settings.tags_file)?,
            images: load_catalog(&settings.images_file)?,
            template,
        })
    }
}

fn load_catalog<T: DeserializeOwned + Default>(path: &Path) -> Result<T, PipelineError> {
    Ok(store::try_read_json(path)?.unwrap_or_default())
}
