//! HTML rendering by placeholder substitution.
//!
//! Templates use `{{name}}` placeholders. Every substituted value is escaped
//! except `body`, `tags` and `references`, which are built here from
//! escaped parts.

use chrono::{DateTime, Utc};

use super::ArticleDraft;
use crate::models::{ImageAsset, NormalizedTag, SearchSummary};
use crate::text::escape_html;

pub const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{{title}}</title>
  <meta name="description" content="{{summary}}">
  <meta property="og:title" content="{{title}}">
  <meta property="og:description" content="{{summary}}">
  <meta property="og:image" content="{{image}}">
  <link rel="stylesheet" href="../styles.css">
</head>
<body>
  <article class="post">
    <header class="post-header">
      <p class="post-date"><time datetime="{{dateIso}}">{{date}}</time></p>
      <h1>{{title}}</h1>
      <ul class="post-tags">{{tags}}</ul>
      <img class="post-image" src="{{image}}" alt="{{imageAlt}}">
    </header>
{{body}}
    <footer class="post-footer">
      <p class="post-source">Based on <a href="{{videoUrl}}">{{videoTitle}}</a> by {{sourceName}}.</p>
{{references}}
    </footer>
  </article>
</body>
</html>
"#;

/// Everything a template can reference.
pub struct RenderContext<'a> {
    pub draft: &'a ArticleDraft,
    pub date: DateTime<Utc>,
    pub tags: &'a [NormalizedTag],
    pub image: &'a ImageAsset,
    pub video_title: &'a str,
    pub video_url: &'a str,
    pub source_name: &'a str,
    pub references: &'a [SearchSummary],
}

pub fn render(template: &str, ctx: &RenderContext<'_>) -> String {
    let image_alt = if ctx.image.alt.is_empty() {
        ctx.draft.title.as_str()
    } else {
        ctx.image.alt.as_str()
    };

    let replacements: [(&str, String); 12] = [
        ("title", escape_html(&ctx.draft.title)),
        ("summary", escape_html(&ctx.draft.summary)),
        ("date", ctx.date.format("%Y-%m-%d").to_string()),
        ("dateIso", ctx.date.to_rfc3339()),
        ("image", escape_html(&ctx.image.url)),
        ("imageAlt", escape_html(image_alt)),
        ("tags", render_tags(ctx.tags)),
        ("body", render_body(ctx.draft)),
        ("videoTitle", escape_html(ctx.video_title)),
        ("videoUrl", escape_html(ctx.video_url)),
        ("sourceName", escape_html(ctx.source_name)),
        ("references", render_references(ctx.references)),
    ];

    substitute(template, &replacements)
}

/// Single pass over the template so substituted text is never re-scanned.
/// Unknown placeholders are left as they are.
fn substitute(template: &str, replacements: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len() * 2);
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                match replacements.iter().find(|(key, _)| *key == name) {
                    Some((_, value)) => out.push_str(value),
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn render_tags(tags: &[NormalizedTag]) -> String {
    tags.iter()
        .map(|tag| {
            let style = tag
                .style
                .as_deref()
                .map(|s| format!(" tag-{}", escape_html(s)))
                .unwrap_or_default();
            format!(
                r#"<li class="tag tag-{}{}">{}</li>"#,
                escape_html(&tag.category),
                style,
                escape_html(&tag.label)
            )
        })
        .collect()
}

/// Blank-line separated paragraphs, each wrapped in `<p>`.
fn paragraphs(text: &str, indent: &str) -> String {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("{indent}<p>{}</p>\n", escape_html(p).replace('\n', "<br>")))
        .collect()
}

fn render_body(draft: &ArticleDraft) -> String {
    let mut html = String::new();

    html.push_str("    <section class=\"post-intro\">\n");
    html.push_str(&paragraphs(&draft.intro, "      "));
    html.push_str("    </section>\n");

    for section in &draft.sections {
        html.push_str("    <section class=\"post-section\">\n");
        html.push_str(&format!("      <h2>{}</h2>\n", escape_html(&section.heading)));
        html.push_str(&paragraphs(&section.overview, "      "));
        for sub in &section.sub_sections {
            html.push_str(&format!("      <h3>{}</h3>\n", escape_html(&sub.heading)));
            html.push_str(&paragraphs(&sub.body, "      "));
        }
        html.push_str("    </section>\n");
    }

    html.push_str("    <section class=\"post-conclusion\">\n");
    html.push_str(&paragraphs(&draft.conclusion, "      "));
    html.push_str("    </section>");
    html
}

fn render_references(references: &[SearchSummary]) -> String {
    if references.is_empty() {
        return String::new();
    }
    let items: String = references
        .iter()
        .map(|r| {
            format!(
                "        <li><a href=\"{}\" rel=\"noopener\">{}</a></li>\n",
                escape_html(&r.url),
                escape_html(if r.title.is_empty() { &r.url } else { &r.title })
            )
        })
        .collect();
    format!("      <ul class=\"post-references\">\n{items}      </ul>")
}
