//! Stage prompt construction.
//!
//! Pure functions that render a stage's instruction string from typed
//! inputs: outline generation and refinement, style generation and
//! refinement, single-page refinement, and the conditional augmentation of
//! image-generation prompts. No I/O happens here; keeping the "what to ask"
//! separate from the client's "how to ask" lets prompt wording be tested
//! without any network dependency.

pub mod image;
pub mod outline;
pub mod style;

pub use slidesmith_types::session::DEFAULT_DESIGN_PRINCIPLES;

use slidesmith_types::session::OutlinePage;
use slidesmith_types::settings::{ColorScheme, FontScheme, PageNumberPlacement};

/// Built-in color palette used when the client has not customized one.
pub const DEFAULT_PRIMARY: &str = "#1C2662";
pub const DEFAULT_SECONDARY: &str = "#DAA050";
pub const DEFAULT_ACCENT: &str = "#BC2424";
pub const DEFAULT_GRAY: &str = "#666464";

const DEFAULT_COLOR_SCHEME_SPEC: &str = "\
- Primary (Blue #1C2662): large titles, background blocks, emphasis borders
- Secondary (Gold #DAA050): key figures, second-level headings, chart highlights
- Accent (Red #BC2424): risk warnings and points of special emphasis only
- Gray (#666464): body text and chart axes";

const DEFAULT_FONT_SCHEME_SPEC: &str = "\
- Latin text and numerals: Arial
- Headings: bold sans-serif
- Size guide: main title 48pt, page title 18pt, body 12-16pt; text inside \
graphics follows the same guide";

/// Render the color-scheme block for the style prompt.
///
/// Falls back to the built-in palette when no scheme was supplied.
pub fn build_color_scheme_spec(scheme: Option<&ColorScheme>) -> String {
    let Some(scheme) = scheme else {
        return DEFAULT_COLOR_SCHEME_SPEC.to_string();
    };

    let name = scheme.name.as_deref().unwrap_or("custom palette");
    format!(
        "- Palette name: {name}\n\
         - Primary ({primary}): large titles, background blocks, emphasis borders\n\
         - Secondary ({secondary}): key figures, second-level headings, chart highlights\n\
         - Accent ({accent}): warnings and points of special emphasis\n\
         - Gray ({gray}): body text and chart axes\n\
         \n\
         IMPORTANT: use exactly these colors and no others.",
        primary = scheme.primary,
        secondary = scheme.secondary,
        accent = scheme.accent,
        gray = scheme.gray,
    )
}

/// Render the font-scheme block for the style prompt.
pub fn build_font_scheme_spec(scheme: Option<&FontScheme>) -> String {
    let Some(scheme) = scheme else {
        return DEFAULT_FONT_SCHEME_SPEC.to_string();
    };

    let name = scheme.name.as_deref().unwrap_or("custom fonts");
    format!(
        "- Font set name: {name}\n\
         - Heading font: {title}\n\
         - Body font: {body}\n\
         - Latin text and numerals: {english}\n\
         - Size guide: main title {main}pt, page title {page}pt, body {body_size}pt\n\
         \n\
         IMPORTANT: use exactly these font settings.",
        title = scheme.title,
        body = scheme.body,
        english = scheme.english,
        main = scheme.sizes.main_title,
        page = scheme.sizes.page_title,
        body_size = scheme.sizes.body,
    )
}

/// The page-number directive embedded in the style prompt.
pub fn placement_instruction(placement: PageNumberPlacement) -> &'static str {
    match placement {
        PageNumberPlacement::None => "Pages must not show a page number.",
        PageNumberPlacement::BottomLeft => {
            "The page number must appear in the bottom-left corner."
        }
        PageNumberPlacement::BottomRight => {
            "The page number must appear in the bottom-right corner."
        }
        PageNumberPlacement::BottomCenter => {
            "The page number must appear centered at the bottom of the page."
        }
    }
}

/// Deterministic rendering of an outline, used when the client edits the
/// structured form directly and the text form must be resynchronized.
pub fn render_outline_text(outline: &[OutlinePage]) -> String {
    outline
        .iter()
        .enumerate()
        .map(|(i, page)| {
            let heading = if page.title.is_empty() {
                &page.theme
            } else {
                &page.title
            };
            format!("[Page {}] {}\n{}", i + 1, heading, page.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Outline rendering embedded in the style-generation prompt.
pub fn render_outline_for_style(outline: &[OutlinePage]) -> String {
    outline
        .iter()
        .map(|page| {
            let theme = if page.theme.is_empty() {
                &page.title
            } else {
                &page.theme
            };
            format!(
                "Page {}: {}\nPage title: {}\nCore points:\n{}",
                page.page, theme, page.title, page.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
