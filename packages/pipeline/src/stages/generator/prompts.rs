use crate::models::{Candidate, TagDictionary};
use crate::text::truncate_chars;

pub const ARTICLE_SYSTEM_PROMPT: &str = r#"You are a technology writer for a news blog. Write an original article about the video described by the user, using the research notes as your factual basis.

Rules:
- Do not invent facts that are not in the video metadata or the research notes.
- Write for readers who have not seen the video.
- The title is a headline, not the video title copied verbatim.
- "summary" is one or two sentences for the article list and social cards.
- "intro" and "conclusion" are one or two short paragraphs each; separate paragraphs with a blank line.
- Give 2 to 5 "sections", each with a heading, an overview paragraph and 1 to 3 "subSections".
- "tags" are 2 to 5 short topic names. Prefer names from the known tag list when they fit.

Respond with a JSON object with exactly these fields:
{"title", "summary", "intro", "sections": [{"heading", "overview", "subSections": [{"heading", "body"}]}], "conclusion", "tags"}"#;

const DESCRIPTION_CHARS: usize = 1500;

/// User prompt: video metadata, research notes and the known tag labels.
pub fn build_article_prompt(candidate: &Candidate, tags: &TagDictionary) -> String {
    let video = &candidate.video;
    let mut prompt = String::new();

    prompt.push_str("## Video\n\n");
    prompt.push_str(&format!("Title: {}\n", video.title));
    prompt.push_str(&format!("Channel: {}\n", candidate.source.name));
    prompt.push_str(&format!("Published: {}\n", video.published_at.format("%Y-%m-%d")));
    prompt.push_str(&format!("URL: {}\n", video.url));
    if !candidate.source.focus.is_empty() {
        prompt.push_str(&format!("Channel focus: {}\n", candidate.source.focus.join(", ")));
    }
    if !video.description.trim().is_empty() {
        prompt.push_str(&format!(
            "Description:\n{}\n",
            truncate_chars(video.description.trim(), DESCRIPTION_CHARS)
        ));
    }

    prompt.push_str("\n## Research notes\n\n");
    if let Some(query) = &candidate.search_query {
        prompt.push_str(&format!("Search query: {}\n\n", query.extracted));
    }
    if candidate.search_summaries.is_empty() {
        prompt.push_str("(no web sources found; rely on the video metadata only)\n");
    }
    for (i, summary) in candidate.search_summaries.iter().enumerate() {
        prompt.push_str(&format!(
            "{}. {} ({})\n{}\n\n",
            i + 1,
            summary.title,
            summary.url,
            summary.summary
        ));
    }

    if !tags.entries.is_empty() {
        let labels: Vec<&str> = tags.entries.iter().map(|t| t.label.as_str()).collect();
        prompt.push_str(&format!("\n## Known tags\n\n{}\n", labels.join(", ")));
    }

    prompt
}
