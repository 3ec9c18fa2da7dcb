//! Image-generation prompt augmentation.
//!
//! The base prompt for a page is the style plan's image prompt; this module
//! appends the conditional instruction blocks that depend on what else is
//! attached to the session: a logo directive, one of three mutually
//! exclusive reference directives, and directives for user-supplied page
//! materials. The client sends the attachments themselves; only the wording
//! is built here.

use slidesmith_types::session::{MaterialKind, PageMaterial, ReferenceKind, TemplateAnalysis};

/// Combined table text longer than this is cut with a truncation notice.
const MAX_TABLE_TEXT_CHARS: usize = 3000;

const LOGO_BLOCK: &str = "\n\n[Note] The attachments include the user's company logo. Place it \
in the top-right corner of the generated page, keeping it sharp and complete.";

const TEMPLATE_BLOCK: &str = "\n\n[Highest priority - template design specification]\n\
The attachments include a slide template image the user uploaded. It is the binding design \
specification.\n\
Every generated page must follow the template's visual style exactly, overriding any other \
color or font settings.";

const TEMPLATE_QUALITATIVE_BLOCK: &str = "\n\nStudy the template image carefully for:\n\
1. The precise color palette (exact background, title, body, and accent values)\n\
2. Font styling and size ratios\n\
3. Title and content placement\n\
4. Background design (solid / gradient / imagery / decorative elements)\n\
5. The overall visual register and level of polish\n\
\n\
The generated image must look like another page of the same template.\n\
\n\
[Emphasis] If the template carries background imagery, patterns, or decorative elements, \
reproduce them so every page shares the template's background treatment.";

const REFINE_BLOCK: &str = "\n\n[Delta-edit mode - highest priority]\n\
The attachments include the currently generated version of this page. It is the baseline for \
a touch-up.\n\
Strictly observe:\n\
1. Keep the baseline's overall layout unchanged\n\
2. Keep the baseline's color palette unchanged\n\
3. Keep the baseline's font styling unchanged\n\
4. Apply only the specific changes the user asked for\n\
5. Anything the user did not mention stays exactly as in the baseline\n\
\n\
Generate a page that stays visually consistent with the baseline apart from the requested \
changes.";

const REFERENCE_BLOCK: &str = "\n\n[Also] The attachments include a reference image uploaded \
by the user. Lean on its palette, fonts, and general style when generating the result.";

/// Build the full image-generation prompt for one page.
pub fn build_image_prompt(
    style_prompt: &str,
    logo_present: bool,
    reference_present: bool,
    reference_kind: ReferenceKind,
    template_analysis: Option<&TemplateAnalysis>,
    page_materials: &[PageMaterial],
) -> String {
    let mut prompt = style_prompt.to_string();

    if logo_present {
        prompt.push_str(LOGO_BLOCK);
    }

    if reference_present {
        match reference_kind {
            ReferenceKind::Template => {
                prompt.push_str(TEMPLATE_BLOCK);
                match template_analysis {
                    Some(analysis) => prompt.push_str(&render_template_analysis(analysis)),
                    None => prompt.push_str(TEMPLATE_QUALITATIVE_BLOCK),
                }
            }
            ReferenceKind::Refine => prompt.push_str(REFINE_BLOCK),
            ReferenceKind::Reference => prompt.push_str(REFERENCE_BLOCK),
        }
    }

    let materials_block = render_materials(page_materials);
    if !materials_block.is_empty() {
        prompt.push_str(&materials_block);
    }

    prompt
}

/// The delta-edit preamble wrapped around a page's regenerated prompt when
/// its current image is supplied as the refine baseline.
pub fn wrap_refine_image_prompt(updated_prompt: &str, feedback: &str) -> String {
    format!(
        "[Delta-edit mode] Adjust the attached baseline image according to the user's \
         feedback: {feedback}\n\
         \n\
         Change only what the feedback mentions; keep the rest (layout, palette, style) \
         consistent with the baseline.\n\
         \n\
         Original design prompt:\n\
         {updated_prompt}"
    )
}

/// Render the concrete design values extracted from a template image.
fn render_template_analysis(analysis: &TemplateAnalysis) -> String {
    let per_template = "as in the template";
    let colors = &analysis.colors;
    let fonts = &analysis.fonts;
    let layout = &analysis.layout;
    let background = &analysis.background;

    let yes_no = |b: bool| if b { "yes" } else { "no" };

    format!(
        "\n\n[Template analysis - follow exactly]\n\
         \n\
         Color palette (use these exact values):\n\
         - Background: {bg}\n\
         - Primary (large titles): {primary}\n\
         - Secondary (second-level headings): {secondary}\n\
         - Accent (highlights): {accent}\n\
         - Primary text: {text_primary}\n\
         - Secondary text: {text_secondary}\n\
         \n\
         Fonts:\n\
         - Titles: {title_style}, about {title_size}\n\
         - Body: {body_style}, about {body_size}\n\
         \n\
         Layout:\n\
         - Title position: {title_position}\n\
         - Content area: {content_area}\n\
         - Header bar: {has_header}\n\
         - Footer bar: {has_footer}\n\
         \n\
         Background:\n\
         - Type: {bg_kind}\n\
         - Description: {bg_desc}\n\
         - Decorative elements: {decorations}\n\
         \n\
         Overall style: {summary}\n\
         \n\
         Follow this specification exactly so the generated pages read as pages of one \
         template.\n\
         \n\
         [Emphasis] If the template has background imagery, patterns, or decorative elements, \
         reproduce them on every page.",
        bg = colors.background.as_deref().unwrap_or(per_template),
        primary = colors.primary.as_deref().unwrap_or(per_template),
        secondary = colors.secondary.as_deref().unwrap_or(per_template),
        accent = colors.accent.as_deref().unwrap_or(per_template),
        text_primary = colors.text_primary.as_deref().unwrap_or(per_template),
        text_secondary = colors.text_secondary.as_deref().unwrap_or(per_template),
        title_style = fonts.title_style.as_deref().unwrap_or("bold"),
        title_size = fonts.title_size.as_deref().unwrap_or("48pt"),
        body_style = fonts.body_style.as_deref().unwrap_or("regular"),
        body_size = fonts.body_size.as_deref().unwrap_or("14pt"),
        title_position = layout.title_position.as_deref().unwrap_or(per_template),
        content_area = layout.content_area.as_deref().unwrap_or(per_template),
        has_header = yes_no(layout.has_header),
        has_footer = yes_no(layout.has_footer),
        bg_kind = background.kind.as_deref().unwrap_or(per_template),
        bg_desc = background.description.as_deref().unwrap_or(per_template),
        decorations = if background.has_decorations {
            background
                .decoration_description
                .as_deref()
                .unwrap_or("present")
        } else {
            "none"
        },
        summary = analysis.style_summary.as_deref().unwrap_or(""),
    )
}

/// Render the directives for user-supplied page materials.
fn render_materials(materials: &[PageMaterial]) -> String {
    let mut image_count = 0usize;
    let mut image_descriptions = Vec::new();
    let mut table_blocks = Vec::new();

    for material in materials {
        match material.kind {
            MaterialKind::Image => {
                if material.path.is_some() {
                    image_count += 1;
                    if !material.description.is_empty() {
                        image_descriptions
                            .push(format!("Image {image_count}: {}", material.description));
                    }
                }
            }
            MaterialKind::Table | MaterialKind::TableText => {
                if let Some(text) = material.table_text.as_deref() {
                    if !text.is_empty() {
                        let mut header = format!("[Table: {}]", material.filename);
                        if !material.description.is_empty() {
                            header.push_str(&format!("\nNote: {}", material.description));
                        }
                        table_blocks.push(format!("{header}\n{text}"));
                    }
                }
            }
        }
    }

    let mut blocks = Vec::new();

    if image_count > 0 {
        let descriptions = if image_descriptions.is_empty() {
            String::new()
        } else {
            format!(
                "\nThe user's notes on the images:\n{}",
                image_descriptions.join("\n")
            )
        };
        blocks.push(format!(
            "\n\n[User-supplied image materials - highest priority]\n\
             The attachments include {image_count} image material(s) from the user (charts, \
             screenshots, and the like).{descriptions}\n\
             Requirements:\n\
             1. Embed these images directly into the generated page\n\
             2. Keep their original content, proportions, and sharpness\n\
             3. Do not summarize, redraw, or simplify them\n\
             4. Treat them as the page's core content and lay the page out around them\n\
             5. Use the user's notes to understand what each image is for"
        ));
    }

    if !table_blocks.is_empty() {
        let mut combined = table_blocks.join("\n");
        if combined.len() > MAX_TABLE_TEXT_CHARS {
            let mut cut = MAX_TABLE_TEXT_CHARS;
            while !combined.is_char_boundary(cut) {
                cut -= 1;
            }
            combined.truncate(cut);
            combined.push_str("\n...(table data truncated)");
        }
        blocks.push(format!(
            "\n\n[User-supplied table data - highest priority]\n\
             The tables below must appear on this page. Requirements:\n\
             1. Render the data completely and accurately\n\
             2. A clean table graphic, chart, or other visualization is welcome\n\
             3. Never alter or omit values\n\
             4. Pick a visualization (table, bar, pie, line) that suits the data and the \
             user's notes\n\
             \n\
             {combined}"
        ));
    }

    blocks.concat()
}
