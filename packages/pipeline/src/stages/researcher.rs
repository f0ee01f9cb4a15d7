//! Researcher stage
//!
//! For every `collected` candidate: derive a search query, search the web,
//! drop social/video hosts, then fetch and summarize the top results. Query
//! extraction and summarization degrade to deterministic fallbacks instead
//! of failing; only a failed search leaves the candidate for the next run.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Settings;
use crate::error::{PipelineError, Result};
use crate::kernel::{BaseAI, BasePageFetcher, BaseSearchService, SearchResult};
use crate::models::{
    Candidate, CandidateStatus, QueryMethod, SearchQuery, SearchSummary, SummaryMethod,
};
use crate::outcome::Outcome;
use crate::store::CandidateStore;
use crate::text::{extractive_summary, normalize_whitespace, truncate_chars};

pub const QUERY_SYSTEM_PROMPT: &str = "You write web search queries. Given a video's title and \
description, reply with one short search query (2 to 8 words) naming the product, event or \
topic the video is about. Reply with the query only: no quotes, no explanation.";

pub const SUMMARY_SYSTEM_PROMPT: &str = "You summarize web pages for a blog writer. Summarize \
the page text in 2 to 4 plain sentences, keeping concrete facts, names, numbers and dates. \
Reply with the summary only.";

/// Longer answers are treated as chatter rather than a query.
const MAX_QUERY_CHARS: usize = 120;

/// Description text sent along with the title for query extraction.
const QUERY_DESCRIPTION_CHARS: usize = 500;

/// Hosts whose pages are other videos or social posts, not sources.
pub const DENYLISTED_DOMAINS: [&str; 14] = [
    "youtube.com",
    "youtu.be",
    "twitter.com",
    "x.com",
    "facebook.com",
    "instagram.com",
    "tiktok.com",
    "threads.net",
    "reddit.com",
    "linkedin.com",
    "pinterest.com",
    "vimeo.com",
    "nicovideo.jp",
    "twitch.tv",
];

const REFUSAL_MARKERS: [&str; 7] = [
    "i'm sorry",
    "i am sorry",
    "i cannot",
    "i can't",
    "unable to",
    "as an ai",
    "申し訳",
];

/// A candidate whose research failed and stays `collected`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateFailure {
    pub candidate_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearcherReport {
    pub processed: usize,
    pub researched: Vec<String>,
    pub errors: Vec<CandidateFailure>,
}

pub struct Researcher {
    settings: Settings,
    store: CandidateStore,
    ai: Arc<dyn BaseAI>,
    search: Arc<dyn BaseSearchService>,
    fetcher: Arc<dyn BasePageFetcher>,
}

impl Researcher {
    pub fn new(
        settings: Settings,
        store: CandidateStore,
        ai: Arc<dyn BaseAI>,
        search: Arc<dyn BaseSearchService>,
        fetcher: Arc<dyn BasePageFetcher>,
    ) -> Self {
        Self {
            settings,
            store,
            ai,
            search,
            fetcher,
        }
    }

    /// Process every `collected` candidate in store order.
    pub async fn research(&self, now: DateTime<Utc>) -> Result<ResearcherReport> {
        let mut candidates = self.store.read_all();
        let pending: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.status == CandidateStatus::Collected)
            .map(|(idx, _)| idx)
            .collect();

        info!(pending = pending.len(), "Researching collected candidates");
        let mut report = ResearcherReport::default();

        for idx in pending {
            report.processed += 1;
            let candidate = &mut candidates[idx];

            match self.research_candidate(candidate).await {
                Ok((query, summaries)) => {
                    info!(
                        candidate_id = %candidate.id,
                        query = %query.extracted,
                        method = ?query.method,
                        summaries = summaries.len(),
                        "Candidate researched"
                    );
                    candidate.search_query = Some(query);
                    candidate.search_summaries = summaries;
                    candidate.transition(CandidateStatus::Researched, now)?;
                    report.researched.push(candidate.id.clone());
                }
                Err(message) => {
                    warn!(candidate_id = %candidate.id, error = %message, "Research failed, candidate stays collected");
                    candidate.record_error("research", message.clone(), now);
                    report.errors.push(CandidateFailure {
                        candidate_id: candidate.id.clone(),
                        message,
                    });
                }
            }

            self.store.write_all(&candidates)?;
        }

        Ok(report)
    }

    async fn research_candidate(
        &self,
        candidate: &Candidate,
    ) -> std::result::Result<(SearchQuery, Vec<SearchSummary>), String> {
        let query = self.extract_query(candidate).await;
        if let Some(reason) = query.reason() {
            warn!(candidate_id = %candidate.id, reason, "Query extraction degraded to title");
        }
        let query = query.into_result().map_err(|e| e.to_string())?;
        self.pause().await;

        let results = self
            .web_search(&query.extracted)
            .await
            .into_result()
            .map_err(|e| e.to_string())?;
        self.pause().await;

        let selected = select_results(results, self.settings.search_results);
        if selected.is_empty() {
            warn!(candidate_id = %candidate.id, query = %query.extracted, "No usable search results");
        }

        let mut summaries = Vec::with_capacity(selected.len());
        for result in &selected {
            let summary = self.summarize(result).await;
            if let Some(reason) = summary.reason() {
                debug!(url = %result.link, reason, "Summary degraded");
            }
            summaries.push(summary.into_result().map_err(|e| e.to_string())?);
            self.pause().await;
        }

        Ok((query, summaries))
    }

    /// Web search for `query`. There is no fallback, so a failure is `Fatal`
    /// for this candidate's research.
    pub async fn web_search(&self, query: &str) -> Outcome<Vec<SearchResult>> {
        match self.search.search(query, self.settings.search_fetch_count).await {
            Ok(results) => Outcome::Ok(results),
            Err(e) => Outcome::Fatal(PipelineError::SearchFailed {
                query: query.to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Ask the AI for a search query; the raw title is the fallback.
    pub async fn extract_query(&self, candidate: &Candidate) -> Outcome<SearchQuery> {
        let title = candidate.video.title.trim().to_string();
        let fallback = SearchQuery {
            original: title.clone(),
            extracted: title.clone(),
            method: QueryMethod::Fallback,
        };

        let user = format!(
            "Title: {}\nDescription: {}",
            title,
            truncate_chars(&normalize_whitespace(&candidate.video.description), QUERY_DESCRIPTION_CHARS)
        );

        let answer = match self
            .ai
            .complete(&self.settings.query_model, QUERY_SYSTEM_PROMPT, &user)
            .await
        {
            Ok(answer) => answer,
            Err(e) => return Outcome::degraded(fallback, format!("query extraction failed: {e}")),
        };

        let extracted = clean_query(&answer);
        if extracted.is_empty() {
            return Outcome::degraded(fallback, "query extraction returned nothing");
        }
        if extracted.chars().count() > MAX_QUERY_CHARS {
            return Outcome::degraded(fallback, "query extraction answer too long");
        }

        Outcome::Ok(SearchQuery {
            original: title,
            extracted,
            method: QueryMethod::Ai,
        })
    }

    /// Summarize one search result. Never fails: page fetch failures use
    /// the snippet, AI failures use an extractive summary of the page.
    pub async fn summarize(&self, result: &SearchResult) -> Outcome<SearchSummary> {
        let make = |summary: String, method: SummaryMethod| SearchSummary {
            title: result.title.clone(),
            url: result.link.clone(),
            snippet: result.snippet.clone(),
            summary,
            method,
        };
        let snippet = normalize_whitespace(&result.snippet);

        let text = match self.fetcher.fetch_text(&result.link).await {
            Ok(text) => normalize_whitespace(&text),
            Err(e) => {
                return Outcome::degraded(make(snippet, SummaryMethod::Snippet), format!("fetch failed: {e}"))
            }
        };
        if text.is_empty() {
            return Outcome::degraded(make(snippet, SummaryMethod::Snippet), "page had no text");
        }
        let text = truncate_chars(&text, self.settings.page_text_max_chars);

        let (min, max) = (self.settings.summary_min_chars, self.settings.summary_max_chars);
        let extractive = || make(extractive_summary(&text, min, max), SummaryMethod::Extractive);

        self.pause().await;
        let user = format!(
            "Title: {}\nURL: {}\nMaximum length: {} characters\n\n{}",
            result.title, result.link, max, text
        );
        match self
            .ai
            .complete(&self.settings.summary_model, SUMMARY_SYSTEM_PROMPT, &user)
            .await
        {
            Ok(answer) => {
                let answer = normalize_whitespace(&answer);
                if is_low_quality(&answer, min) {
                    Outcome::degraded(extractive(), "AI summary too short or refused")
                } else {
                    let summary = if answer.chars().count() > max {
                        extractive_summary(&answer, min, max)
                    } else {
                        answer
                    };
                    Outcome::Ok(make(summary, SummaryMethod::Ai))
                }
            }
            Err(e) => Outcome::degraded(extractive(), format!("AI summary failed: {e}")),
        }
    }

    async fn pause(&self) {
        if !self.settings.request_delay.is_zero() {
            tokio::time::sleep(self.settings.request_delay).await;
        }
    }
}

/// First line of the answer without surrounding quotes or a trailing period.
fn clean_query(answer: &str) -> String {
    let line = answer.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    let line = line
        .strip_prefix("Query:")
        .or_else(|| line.strip_prefix("query:"))
        .unwrap_or(line);
    normalize_whitespace(line.trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '「' || c == '」'))
        .trim_end_matches('.')
        .to_string()
}

fn is_low_quality(summary: &str, min_chars: usize) -> bool {
    if summary.chars().count() < min_chars {
        return true;
    }
    // Refusals open the answer; the same words later on are ordinary prose.
    let opening = summary
        .trim_start_matches(|c: char| c.is_whitespace() || c == '"' || c == '\'')
        .to_lowercase();
    REFUSAL_MARKERS.iter().any(|m| opening.starts_with(m))
}

/// True when the link's host is a denylisted domain or a subdomain of one.
/// Unparseable links count as denied.
pub fn is_denylisted(link: &str) -> bool {
    let Some(host) = Url::parse(link)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
    else {
        return true;
    };

    DENYLISTED_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
}

/// Denylist filter, then the first `limit` results in rank order.
pub fn select_results(results: Vec<SearchResult>, limit: usize) -> Vec<SearchResult> {
    results
        .into_iter()
        .filter(|r| !is_denylisted(&r.link))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::{MockAI, MockPageFetcher, MockSearch};
    use crate::models::{SourceDescriptor, VideoSnapshot};
    use chrono::TimeZone;
    use std::time::Duration;

    const LONG_PAGE: &str = "Google announced Gemini 3 on Tuesday. The model improves reasoning \
        and coding benchmarks by a wide margin. It is available in the Gemini app today. \
        Developers can use it through the API and Vertex AI. Pricing was not changed for now. \
        More features will arrive over the coming weeks, the company said in a statement.";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn settings() -> Settings {
        Settings {
            request_delay: Duration::ZERO,
            ..Settings::default()
        }
    }

    fn result(link: &str) -> SearchResult {
        SearchResult {
            title: format!("Result {link}"),
            link: link.to_string(),
            snippet: format!("Snippet for {link}"),
        }
    }

    fn candidate(video_id: &str, title: &str) -> Candidate {
        Candidate::collected(
            SourceDescriptor {
                name: "Tech".into(),
                platform: "youtube".into(),
                external_id: "UC1".into(),
                focus: vec![],
            },
            VideoSnapshot {
                video_id: video_id.into(),
                title: title.into(),
                description: "Everything announced today".into(),
                url: format!("https://www.youtube.com/watch?v={video_id}"),
                published_at: now(),
                thumbnail_url: None,
            },
            now(),
        )
    }

    fn researcher(
        dir: &tempfile::TempDir,
        ai: MockAI,
        search: MockSearch,
        fetcher: MockPageFetcher,
    ) -> Researcher {
        Researcher::new(
            settings(),
            CandidateStore::new(dir.path().join("candidates.json")),
            Arc::new(ai),
            Arc::new(search),
            Arc::new(fetcher),
        )
    }

    #[test]
    fn test_denylist_matches_domains_and_subdomains() {
        assert!(is_denylisted("https://www.youtube.com/watch?v=1"));
        assert!(is_denylisted("https://m.facebook.com/post"));
        assert!(is_denylisted("https://x.com/someone"));
        assert!(is_denylisted("not a url"));
        assert!(!is_denylisted("https://blog.google/technology/gemini"));
        assert!(!is_denylisted("https://netflix.com/"));
    }

    #[test]
    fn test_select_results_filters_then_takes_top() {
        let results = vec![
            result("https://youtube.com/a"),
            result("https://one.example/"),
            result("https://reddit.com/r/x"),
            result("https://two.example/"),
            result("https://three.example/"),
            result("https://four.example/"),
        ];
        let links: Vec<_> = select_results(results, 3).into_iter().map(|r| r.link).collect();
        assert_eq!(
            links,
            vec!["https://one.example/", "https://two.example/", "https://three.example/"]
        );
    }

    #[test]
    fn test_clean_query() {
        assert_eq!(clean_query("\"Gemini 3\"\n"), "Gemini 3");
        assert_eq!(clean_query("Query: Gemini 3 release."), "Gemini 3 release");
        assert_eq!(clean_query("   \n  "), "");
    }

    #[tokio::test]
    async fn test_query_extraction_falls_back_to_title() {
        let dir = tempfile::tempdir().unwrap();
        let r = researcher(
            &dir,
            MockAI::new().failing_on(QUERY_SYSTEM_PROMPT, "rate limited"),
            MockSearch::new(),
            MockPageFetcher::new(),
        );

        let outcome = r.extract_query(&candidate("a", "Gemini 3 Launch")).await;
        assert!(outcome.is_degraded());
        let query = outcome.into_result().unwrap();
        assert_eq!(query.extracted, "Gemini 3 Launch");
        assert_eq!(query.method, QueryMethod::Fallback);
    }

    #[tokio::test]
    async fn test_overlong_query_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let r = researcher(
            &dir,
            MockAI::new().with_rule(QUERY_SYSTEM_PROMPT, "word ".repeat(40)),
            MockSearch::new(),
            MockPageFetcher::new(),
        );
        let outcome = r.extract_query(&candidate("a", "Gemini 3 Launch")).await;
        assert_eq!(outcome.reason(), Some("query extraction answer too long"));
    }

    #[tokio::test]
    async fn test_summary_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        let ai = MockAI::new()
            .with_rule("https://good.example/", "Google launched Gemini 3, its most capable model, with large gains in reasoning and coding. It ships today in the Gemini app and API.")
            .with_rule("https://short.example/", "Too short.")
            .failing_on("https://broken-ai.example/", "timeout");
        let fetcher = MockPageFetcher::new()
            .with_page("https://good.example/", LONG_PAGE)
            .with_page("https://short.example/", LONG_PAGE)
            .with_page("https://broken-ai.example/", LONG_PAGE);
        let r = researcher(&dir, ai, MockSearch::new(), fetcher);

        let good = r.summarize(&result("https://good.example/")).await;
        assert!(good.is_ok());
        assert_eq!(good.value().unwrap().method, SummaryMethod::Ai);

        let short = r.summarize(&result("https://short.example/")).await.into_result().unwrap();
        assert_eq!(short.method, SummaryMethod::Extractive);
        assert!(short.summary.chars().count() >= 120);
        assert!(short.summary.chars().count() <= 400);

        let broken = r.summarize(&result("https://broken-ai.example/")).await;
        assert!(broken.is_degraded());
        assert_eq!(broken.value().unwrap().method, SummaryMethod::Extractive);

        let unreachable = r.summarize(&result("https://down.example/")).await.into_result().unwrap();
        assert_eq!(unreachable.method, SummaryMethod::Snippet);
        assert_eq!(unreachable.summary, "Snippet for https://down.example/");
    }

    #[test]
    fn test_refusal_is_low_quality() {
        assert!(is_low_quality(&"I'm sorry, but I can't access that page. ".repeat(5), 120));
        assert!(!is_low_quality(&"Gemini 3 improves reasoning. ".repeat(6), 120));
        assert!(is_low_quality(&format!("  Unable to open the article. {}", "x".repeat(120)), 120));
    }

    #[test]
    fn test_refusal_words_inside_a_factual_summary_are_kept() {
        let summary = "After the Gemini 3 rollout many users were unable to sign in for two hours, \
            Google said, before a fix restored access. I cannot overstate how quickly the team responded, \
            one engineer wrote.";
        assert!(summary.chars().count() >= 120);
        assert!(!is_low_quality(summary, 120));
    }

    #[tokio::test]
    async fn test_search_failure_keeps_candidate_collected() {
        let dir = tempfile::tempdir().unwrap();
        let ai = MockAI::new()
            .with_rule("Title: Broken", "broken query")
            .with_rule("Title: Working Title", "Working Title");
        let search = MockSearch::new()
            .failing_for("broken query")
            .with_results("Working Title", vec![result("https://ok.example/")]);
        let r = researcher(&dir, ai, search, MockPageFetcher::new());
        r.store
            .write_all(&[candidate("a", "Broken"), candidate("b", "Working Title")])
            .unwrap();

        let report = r.research(now()).await.unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(report.researched, vec!["yt-b"]);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].candidate_id, "yt-a");
        assert!(report.errors[0].message.starts_with("search failed for \"broken query\""));
        assert_eq!(r.web_search("broken query").await.value(), None);

        let stored = r.store.read_all();
        assert_eq!(stored[0].status, CandidateStatus::Collected);
        assert_eq!(stored[0].errors.len(), 1);
        assert_eq!(stored[0].errors[0].stage, "research");
        assert_eq!(stored[1].status, CandidateStatus::Researched);
        assert_eq!(stored[1].search_summaries.len(), 1);
        assert_eq!(stored[1].search_summaries[0].method, SummaryMethod::Snippet);
    }
}
