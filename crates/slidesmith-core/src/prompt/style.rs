//! Style generation, style refinement, and single-page refinement prompts.

use slidesmith_types::session::OutlinePage;
use slidesmith_types::settings::{ColorScheme, FontScheme, PageNumberPlacement};

use super::{
    DEFAULT_ACCENT, DEFAULT_GRAY, DEFAULT_PRIMARY, DEFAULT_SECONDARY, build_color_scheme_spec,
    build_font_scheme_spec, placement_instruction, render_outline_for_style,
};

/// JSON shape for the per-page design plan.
const STYLE_JSON_INSTRUCTION: &str = r#"Output JSON:

```json
{
    "pages": [
        {
            "page": 1,
            "theme": "page theme",
            "design_concept": "design rationale",
            "prompt": "detailed image-generation prompt covering every visual element, color, layout, and text content"
        }
    ]
}
```"#;

/// Inputs resolved by the state machine before style generation.
#[derive(Debug)]
pub struct StyleInputs<'a> {
    pub outline: &'a [OutlinePage],
    pub design_principles: &'a str,
    pub color_scheme: Option<&'a ColorScheme>,
    pub font_scheme: Option<&'a FontScheme>,
    pub placement: PageNumberPlacement,
}

/// Render the style-generation instruction string.
///
/// The two example prompts are parameterized on the resolved palette so the
/// provider sees concrete color values in context.
pub fn build_style_prompt(inputs: &StyleInputs<'_>) -> String {
    let (primary, secondary, accent, gray) = match inputs.color_scheme {
        Some(scheme) => (
            scheme.primary.as_str(),
            scheme.secondary.as_str(),
            scheme.accent.as_str(),
            scheme.gray.as_str(),
        ),
        None => (DEFAULT_PRIMARY, DEFAULT_SECONDARY, DEFAULT_ACCENT, DEFAULT_GRAY),
    };

    format!(
        "Given the slide outline below, produce a detailed design plan and an image-generation \
         prompt for every page.\n\
         \n\
         [Color scheme]\n\
         {colors}\n\
         \n\
         [Font scheme]\n\
         {fonts}\n\
         \n\
         [Design principles]\n\
         {principles}\n\
         \n\
         [Slide outline]\n\
         {outline}\n\
         \n\
         For every page produce:\n\
         1. A short design rationale\n\
         2. A detailed image-generation prompt for the image model\n\
         \n\
         NOTE: the page title goes in the top-left corner of each page. {placement}\n\
         \n\
         {shape}\n\
         \n\
         [Example prompts] for reference:\n\
         \n\
         [Reference prompt 1]: \"Slide design, professional business style. Pure white \
         background, title text reading \"Core strategy overview\" at 18pt in the primary color \
         ({primary}). The central visual is a flat balance-scale figure with its pivot in the \
         primary color ({primary}). Left pan, slightly lower: a shield icon outlined in the \
         accent color ({accent}) labeled \"Contain risk\" with keywords \"stable base \
         allocation, drawdown control\" and a bold accent-colored down arrow beneath. Right \
         pan, slightly higher: stacked coins and a rising trend arrow in the secondary color \
         ({secondary}) labeled \"Trade more\" with keywords \"return enhancement, flexible \
         response\" and a bold secondary-colored up arrow beneath. Clean digital look, clear \
         information hierarchy.\"\n\
         \n\
         [Reference prompt 2]: \"Slide design, professional business style. Pure white \
         background, title \"Transparent fixed income plus\" at 18pt in the primary color \
         ({primary}). The visual center is a large inverted pyramid (funnel) split into three \
         horizontal bands: top band (widest) filled with the primary color ({primary}) with \
         white text, middle band in the secondary color ({secondary}) with white text, bottom \
         band (narrowest) in the gray ({gray}) with white text. Layered composition, corporate \
         identity palette, uncluttered canvas.\"",
        colors = build_color_scheme_spec(inputs.color_scheme),
        fonts = build_font_scheme_spec(inputs.font_scheme),
        principles = inputs.design_principles,
        outline = render_outline_for_style(inputs.outline),
        placement = placement_instruction(inputs.placement),
        shape = STYLE_JSON_INSTRUCTION,
    )
}

/// Render the style-refinement instruction string.
pub fn build_style_refine_prompt(current_style: &str, feedback: &str) -> String {
    format!(
        "The user has feedback on the current design plan. Adjust it accordingly.\n\
         \n\
         [Current design plan]\n\
         {current_style}\n\
         \n\
         [User feedback]\n\
         {feedback}\n\
         \n\
         Output the complete revised design plan. {STYLE_JSON_INSTRUCTION}"
    )
}

/// Render the single-page refinement instruction string.
///
/// Explicitly constrains the provider to a delta edit: only what the
/// feedback names changes, layout/colors/fonts stay put, and the response is
/// a single JSON object rather than a `pages` array.
pub fn build_page_refine_prompt(
    page_number: u32,
    theme: &str,
    design_concept: &str,
    current_prompt: &str,
    feedback: &str,
) -> String {
    format!(
        "The user wants a small adjustment to page {page_number} of the deck. Apply a minimal \
         revision to this page only.\n\
         \n\
         [Ground rules]\n\
         This is a touch-up, not a redesign:\n\
         1. Keep the page's overall layout, colors, and font styling unchanged\n\
         2. Change only what the feedback explicitly mentions\n\
         3. Everything the user did not mention stays as it is\n\
         4. Preserve visual consistency with the original design\n\
         \n\
         [Current page]\n\
         Page: {page_number}\n\
         Theme: {theme}\n\
         Current design rationale: {design_concept}\n\
         Current image prompt: {current_prompt}\n\
         \n\
         [User feedback]\n\
         {feedback}\n\
         \n\
         Output the revised design for this page, changing only what the feedback requires. \
         Respond with a single JSON object, not an array:\n\
         \n\
         ```json\n\
         {{\n\
             \"page\": {page_number},\n\
             \"theme\": \"page theme (unchanged unless the feedback says otherwise)\",\n\
             \"design_concept\": \"revised rationale noting what changed\",\n\
             \"prompt\": \"revised image prompt keeping the original style, only the requested parts changed\"\n\
         }}\n\
         ```"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_page_outline() -> Vec<OutlinePage> {
        vec![OutlinePage {
            page: 1,
            theme: "overview".to_string(),
            title: "Overview".to_string(),
            content: "points".to_string(),
        }]
    }

    #[test]
    fn test_style_prompt_uses_default_palette() {
        let outline = one_page_outline();
        let inputs = StyleInputs {
            outline: &outline,
            design_principles: "white background",
            color_scheme: None,
            font_scheme: None,
            placement: PageNumberPlacement::BottomCenter,
        };
        let prompt = build_style_prompt(&inputs);
        assert!(prompt.contains(DEFAULT_PRIMARY));
        assert!(prompt.contains(DEFAULT_SECONDARY));
        assert!(prompt.contains("centered at the bottom"));
        assert!(prompt.contains("white background"));
        assert!(prompt.contains("design_concept"));
    }

    #[test]
    fn test_style_prompt_parameterizes_examples_on_custom_palette() {
        let scheme = ColorScheme {
            name: None,
            primary: "#111111".to_string(),
            secondary: "#222222".to_string(),
            accent: "#333333".to_string(),
            gray: "#444444".to_string(),
        };
        let outline = one_page_outline();
        let inputs = StyleInputs {
            outline: &outline,
            design_principles: "p",
            color_scheme: Some(&scheme),
            font_scheme: None,
            placement: PageNumberPlacement::None,
        };
        let prompt = build_style_prompt(&inputs);
        assert!(prompt.contains("#111111"));
        assert!(!prompt.contains(DEFAULT_PRIMARY));
        assert!(prompt.contains("must not show a page number"));
    }

    #[test]
    fn test_style_refine_prompt_sections() {
        let prompt = build_style_refine_prompt("current plan text", "less red");
        assert!(prompt.contains("[Current design plan]\ncurrent plan text"));
        assert!(prompt.contains("[User feedback]\nless red"));
        assert!(prompt.contains("\"pages\""));
    }

    #[test]
    fn test_page_refine_prompt_requests_single_object() {
        let prompt = build_page_refine_prompt(3, "risk", "dark theme", "old prompt", "bigger title");
        assert!(prompt.contains("page 3"));
        assert!(prompt.contains("dark theme"));
        assert!(prompt.contains("old prompt"));
        assert!(prompt.contains("bigger title"));
        assert!(prompt.contains("single JSON object, not an array"));
        assert!(!prompt.contains("\"pages\""));
    }
}
