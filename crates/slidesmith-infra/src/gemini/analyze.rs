//! Single-shot template analysis.
//!
//! Derives a structured design specification (colors, fonts, layout,
//! background, summary) from an uploaded template image. Unlike the
//! generation calls this is fired once with no retry: the session simply
//! carries no analysis when it fails, and image prompts fall back to the
//! qualitative replication instruction.

use std::path::Path;

use tracing::{info, warn};

use slidesmith_core::generate::TemplateAnalyzer;
use slidesmith_core::parse::recover_brace_span;
use slidesmith_types::session::TemplateAnalysis;

use super::GeminiClient;
use super::types::GenerateContentRequest;

const ANALYSIS_PROMPT: &str = r##"You are a professional slide design analyst.
Output JSON data directly, with no preamble, reasoning, Markdown tags, or closing summary.

The JSON structure you must return:
{
    "colors": {
        "background": "#FFFFFF",
        "primary": "#000000",
        "secondary": "#000000",
        "accent": "#000000",
        "text_primary": "#000000",
        "text_secondary": "#000000"
    },
    "fonts": {
        "title_style": "title font description",
        "title_size": "estimated size",
        "body_style": "body font description",
        "body_size": "estimated body size"
    },
    "layout": {
        "title_position": "title placement description",
        "content_area": "content area description",
        "has_header": true,
        "has_footer": true,
        "has_sidebar": false
    },
    "background": {
        "type": "solid/gradient/image/pattern",
        "description": "detailed description",
        "has_decorations": true,
        "decoration_description": "decoration description"
    },
    "style_summary": "overall style summary"
}

Requirements:
1. Colors must be valid 6-digit hex values (#RRGGBB).
2. Follow the JSON structure strictly."##;

/// Parse the analysis response: direct parse first, brace-span recovery
/// second.
fn parse_analysis(raw: &str) -> Option<TemplateAnalysis> {
    if let Ok(analysis) = serde_json::from_str::<TemplateAnalysis>(raw) {
        return Some(analysis);
    }
    let recovered = recover_brace_span(raw)?;
    serde_json::from_value(recovered).ok()
}

impl TemplateAnalyzer for GeminiClient {
    async fn analyze_template(&self, image_path: &Path) -> Option<TemplateAnalysis> {
        let Some(attachment) = Self::load_attachment(image_path).await else {
            warn!(path = %image_path.display(), "template image unreadable, skipping analysis");
            return None;
        };

        let request =
            GenerateContentRequest::analysis(&self.text_model, ANALYSIS_PROMPT, attachment);
        let response = match self
            .post_once(&self.text_model, &request, self.analyze_timeout)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(%err, "template analysis call failed");
                return None;
            }
        };

        let raw = response.analysis_text()?;
        match parse_analysis(raw) {
            Some(analysis) => {
                info!(
                    summary = analysis.style_summary.as_deref().unwrap_or("none"),
                    "template analysis parsed"
                );
                Some(analysis)
            }
            None => {
                warn!("template analysis response carried no recoverable JSON");
                None
            }
        }
    }
}
