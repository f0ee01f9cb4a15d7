//! Fixtures for the "Gemini 3 Launch" scenario used across the integration tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use pipeline_core::kernel::test_dependencies::{
    MockAI, MockPageFetcher, MockSearch, MockVideoSource, TestDependencies,
};
use pipeline_core::kernel::{ListedVideo, SearchResult};
use pipeline_core::models::{
    Candidate, ImageAsset, ImageCatalog, SourceDescriptor, TagDefinition, TagDictionary,
    VideoSnapshot,
};
use pipeline_core::Catalogs;
use serde_json::json;

pub const CHANNEL_ID: &str = "UC_tech";
pub const VIDEO_ID: &str = "abc123";
pub const VIDEO_TITLE: &str = "Gemini 3 Launch";
pub const QUERY: &str = "Gemini 3";
pub const BLOG_URL: &str = "https://blog.google/technology/gemini-3/";
pub const NEWS_URL: &str = "https://news.example.com/gemini-3-review";
pub const SUMMARY: &str = "Google released Gemini 3, its most capable model so far, with \
    stronger reasoning and coding results. It is available in the Gemini app and through the API.";

/// 2025-01-01T00:00:00Z
pub fn run_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

pub fn source() -> SourceDescriptor {
    SourceDescriptor {
        name: "Tech Channel".into(),
        platform: "youtube".into(),
        external_id: CHANNEL_ID.into(),
        focus: vec!["AI".into()],
    }
}

pub fn listed_video(video_id: &str, title: &str, published_at: DateTime<Utc>) -> ListedVideo {
    ListedVideo {
        video_id: video_id.into(),
        title: title.into(),
        description: format!("{title} explained in ten minutes."),
        url: format!("https://www.youtube.com/watch?v={video_id}"),
        published_at,
        thumbnail_url: None,
    }
}

pub fn tags() -> TagDictionary {
    TagDictionary::new(vec![
        TagDefinition {
            slug: "gemini".into(),
            label: "Gemini".into(),
            category: "product".into(),
            style: None,
            aliases: vec!["Google Gemini".into()],
        },
        TagDefinition {
            slug: "ai".into(),
            label: "AI".into(),
            category: "technology".into(),
            style: Some("blue".into()),
            aliases: vec!["artificial intelligence".into()],
        },
    ])
}

pub fn images() -> ImageCatalog {
    let image = |url: &str, topics: &[&str]| ImageAsset {
        url: url.into(),
        alt: String::new(),
        topics: topics.iter().map(|t| t.to_string()).collect(),
        category: None,
    };
    ImageCatalog {
        images: vec![
            image("/images/ai-1.jpg", &["ai"]),
            image("/images/ai-2.jpg", &["ai", "gemini"]),
            image("/images/ai-3.jpg", &["gemini"]),
            image("/images/phones.jpg", &["smartphone"]),
        ],
        default_image: None,
    }
}

pub fn catalogs() -> Catalogs {
    Catalogs {
        sources: vec![source()],
        tags: tags(),
        images: images(),
        template: None,
    }
}

pub fn draft_json(summary: &str) -> serde_json::Value {
    json!({
        "title": VIDEO_TITLE,
        "summary": summary,
        "intro": "Google has a new flagship model.\n\nHere is what changed.",
        "sections": [{
            "heading": "What is new",
            "overview": "Gemini 3 focuses on reasoning.",
            "subSections": [{"heading": "Coding", "body": "Benchmarks improved."}]
        }],
        "conclusion": "Worth a try.",
        "tags": ["Google Gemini", "artificial intelligence"]
    })
}

/// AI answering each prompt by its system instructions.
pub fn gemini_ai(article_summary: &str) -> MockAI {
    MockAI::new()
        .with_json_rule("technology writer for a news blog", &draft_json(article_summary))
        .with_rule("You write web search queries", QUERY)
        .with_rule("You summarize web pages", SUMMARY)
}

pub fn gemini_search() -> MockSearch {
    MockSearch::new().with_results(
        QUERY,
        vec![
            SearchResult {
                title: "Gemini 3 launch video".into(),
                link: "https://www.youtube.com/watch?v=other".into(),
                snippet: "Watch the keynote".into(),
            },
            SearchResult {
                title: "Introducing Gemini 3".into(),
                link: BLOG_URL.into(),
                snippet: "Our most intelligent model".into(),
            },
            SearchResult {
                title: "Gemini 3 review".into(),
                link: NEWS_URL.into(),
                snippet: "Hands on with Gemini 3".into(),
            },
        ],
    )
}

pub fn gemini_fetcher() -> MockPageFetcher {
    MockPageFetcher::new()
        .with_page(BLOG_URL, "Today we are introducing Gemini 3. ".repeat(20))
        .with_page(NEWS_URL, "We spent a week with Gemini 3. ".repeat(20))
}

pub fn gemini_videos() -> MockVideoSource {
    MockVideoSource::new().with_videos(
        CHANNEL_ID,
        vec![listed_video(VIDEO_ID, VIDEO_TITLE, run_date() - Duration::hours(12))],
    )
}

pub fn gemini_deps(article_summary: &str) -> TestDependencies {
    TestDependencies::new()
        .mock_ai(gemini_ai(article_summary))
        .mock_search(gemini_search())
        .mock_fetcher(gemini_fetcher())
        .mock_videos(gemini_videos())
}

/// A `collected` candidate created at `created_at`.
pub fn collected_candidate(video_id: &str, created_at: DateTime<Utc>) -> Candidate {
    Candidate::collected(
        source(),
        VideoSnapshot {
            video_id: video_id.into(),
            title: format!("Video {video_id}"),
            description: String::new(),
            url: format!("https://www.youtube.com/watch?v={video_id}"),
            published_at: created_at,
            thumbnail_url: None,
        },
        created_at,
    )
}
