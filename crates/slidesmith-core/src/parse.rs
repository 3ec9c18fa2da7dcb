//! JSON extraction from free-text provider responses.
//!
//! Providers are asked to emit a fenced ```json block alongside their prose,
//! but responses drift: the fence may be missing, the JSON may be wrapped in
//! commentary, or it may carry `//` comments. Extraction is therefore
//! tolerant: fenced block first, then the span between the first `{` and the
//! last `}`. Either branch that fails to parse yields `None` rather than an
//! error -- callers treat that as an empty response.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use slidesmith_types::session::{OutlinePage, StylePage};

/// Extract the first JSON object from a free-text response.
///
/// Looks for a fenced code block labeled `json`; falls back to the span
/// between the first `{` and the last `}` in the full text.
pub fn extract_json(text: &str) -> Option<Value> {
    if let Some(fenced) = extract_fenced_block(text) {
        if let Ok(value) = serde_json::from_str::<Value>(fenced) {
            return Some(value);
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// The contents of the first ```json fenced block, if one exists.
fn extract_fenced_block(text: &str) -> Option<&str> {
    let fence_start = text.find("```json")?;
    let body_start = text[fence_start..].find('\n')? + fence_start + 1;
    let body_end = text[body_start..].find("```")? + body_start;
    Some(text[body_start..body_end].trim())
}

/// Parse the `pages` array of an outline response.
///
/// Returns `None` when the response has no parseable JSON or the JSON has no
/// `pages` key; per-page fields tolerate absence via serde defaults.
pub fn parse_outline_pages(text: &str) -> Option<Vec<OutlinePage>> {
    let value = extract_json(text)?;
    let pages = value.get("pages")?.clone();
    serde_json::from_value(pages).ok()
}

/// Parse the `pages` array of a style response.
pub fn parse_style_pages(text: &str) -> Option<Vec<StylePage>> {
    let value = extract_json(text)?;
    let pages = value.get("pages")?.clone();
    serde_json::from_value(pages).ok()
}

/// Parse the single-object response of a page refinement.
///
/// The page-refine prompt asks for one JSON object, not a `pages` array.
pub fn parse_single_style_page(text: &str) -> Option<StylePage> {
    let value = extract_json(text)?;
    if value.get("pages").is_some() {
        // Provider ignored the single-object instruction; take the first entry.
        let pages: Vec<StylePage> = serde_json::from_value(value.get("pages")?.clone()).ok()?;
        return pages.into_iter().next();
    }
    serde_json::from_value(value).ok()
}

/// Last-resort recovery of a brace span from a malformed analysis response.
///
/// Grabs the first `{` through the last `}` across lines and strips `//`
/// line comments before parsing, since those are the two most common ways a
/// forced-JSON response goes wrong.
pub fn recover_brace_span(text: &str) -> Option<Value> {
    static SPAN: OnceLock<Regex> = OnceLock::new();
    static LINE_COMMENT: OnceLock<Regex> = OnceLock::new();

    let span = SPAN
        .get_or_init(|| Regex::new(r"\{[\s\S]*\}").expect("valid regex"))
        .find(text)?;
    let cleaned = LINE_COMMENT
        .get_or_init(|| Regex::new(r"//[^\n]*").expect("valid regex"))
        .replace_all(span.as_str(), "");
    serde_json::from_str(&cleaned).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_fenced_json_block() {
        let text = "Here is the outline.\n```json\n{\"pages\": [{\"page\": 1, \"theme\": \"t\", \"title\": \"T\", \"content\": \"c\"}]}\n```\nLet me know.";
        let pages = parse_outline_pages(text).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page, 1);
        assert_eq!(pages[0].title, "T");
    }

    #[test]
    fn test_falls_back_to_brace_span() {
        let text = "No fence here, but {\"pages\": [{\"page\": 1}, {\"page\": 2}]} buried in prose.";
        let pages = parse_outline_pages(text).unwrap();
        assert_eq!(pages.len(), 2);
    }

    #[test]
    fn test_round_trip_preserves_embedded_data() {
        let embedded = serde_json::json!({
            "pages": [
                {"page": 1, "theme": "strategy", "title": "Overview", "content": "a\nb"},
                {"page": 2, "theme": "risk", "title": "Risks", "content": "c"},
            ]
        });
        let text = format!("prose\n```json\n{embedded}\n```\n");
        let value = extract_json(&text).unwrap();
        assert_eq!(value, embedded);
    }

    #[test]
    fn test_unparseable_text_yields_none() {
        assert!(extract_json("no json at all").is_none());
        assert!(extract_json("{ broken json").is_none());
        assert!(parse_outline_pages("```json\nnot json\n```").is_none());
    }

    #[test]
    fn test_missing_pages_key_yields_none() {
        assert!(parse_outline_pages("{\"items\": []}").is_none());
    }

    #[test]
    fn test_broken_fence_falls_back_to_span() {
        // Fenced block is malformed but a valid object exists in the text.
        let text = "```json\n{oops\n```\ntrailing {\"pages\": []} end}";
        // The brace fallback spans from the first `{` to the last `}`, which
        // is not valid JSON here, so extraction fails entirely.
        assert!(extract_json(text).is_none());
    }

    #[test]
    fn test_parse_single_style_page_object() {
        let text = r#"{"page": 2, "theme": "risk", "design_concept": "darker", "prompt": "p"}"#;
        let page = parse_single_style_page(text).unwrap();
        assert_eq!(page.page, 2);
        assert_eq!(page.design_concept, "darker");
    }

    #[test]
    fn test_parse_single_style_page_accepts_stray_array() {
        let text = r#"{"pages": [{"page": 1, "prompt": "p1"}, {"page": 2, "prompt": "p2"}]}"#;
        let page = parse_single_style_page(text).unwrap();
        assert_eq!(page.page, 1);
    }

    #[test]
    fn test_recover_brace_span_strips_comments() {
        let text = "thinking...\n{\n  \"style_summary\": \"flat\" // terse\n}\ndone";
        let value = recover_brace_span(text).unwrap();
        assert_eq!(value["style_summary"], "flat");
    }

    #[test]
    fn test_recover_brace_span_gives_up_cleanly() {
        assert!(recover_brace_span("nothing structured").is_none());
    }
}
