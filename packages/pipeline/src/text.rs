//! Text helpers shared by the stages: slugs, topic keys, truncation, escaping.

/// Longest topic key kept; long titles still dedupe on their leading words.
const TOPIC_KEY_MAX_CHARS: usize = 60;

const SENTENCE_ENDINGS: [char; 6] = ['.', '!', '?', '。', '！', '？'];

/// Lowercase, alphanumeric runs joined by single hyphens.
///
/// This is the one normalization used for slugs, topic keys and tag slugs,
/// so keys produced from different fields stay comparable.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        if c == '\'' || c == '’' {
            continue;
        }
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Cut a slug to at most `max_chars`, on a hyphen when one is available.
pub fn limit_slug(slug: &str, max_chars: usize) -> String {
    if slug.chars().count() <= max_chars {
        return slug.to_string();
    }
    let head: String = slug.chars().take(max_chars).collect();
    match head.rfind('-') {
        Some(idx) if idx > 0 => head[..idx].to_string(),
        _ => head.trim_end_matches('-').to_string(),
    }
}

/// Dedup key for a video or article title.
pub fn topic_key(title: &str) -> String {
    limit_slug(&slugify(title), TOPIC_KEY_MAX_CHARS)
}

/// Collapse all whitespace runs to single spaces.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Extractive summary: the longest prefix ending on a sentence boundary whose
/// length lies in `[min_chars, max_chars]`. Without such a boundary the text
/// is cut at the last word break below `max_chars` and marked with an
/// ellipsis. Text already shorter than `max_chars` is returned whole.
pub fn extractive_summary(text: &str, min_chars: usize, max_chars: usize) -> String {
    let text = normalize_whitespace(text);
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return text;
    }

    let window = &chars[..max_chars];
    let sentence_end = window
        .iter()
        .enumerate()
        .rev()
        .find(|(idx, c)| SENTENCE_ENDINGS.contains(c) && idx + 1 >= min_chars)
        .map(|(idx, _)| idx + 1);

    if let Some(end) = sentence_end {
        return window[..end].iter().collect();
    }

    let word_end = window
        .iter()
        .rposition(|c| c.is_whitespace())
        .filter(|&idx| idx >= min_chars)
        .unwrap_or(max_chars);
    let mut summary: String = window[..word_end].iter().collect();
    summary.truncate(summary.trim_end().len());
    summary.push('…');
    summary
}

/// Escape text for HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
