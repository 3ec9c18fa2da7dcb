//! Session record and stage machine positions.
//!
//! A [`Session`] is the central entity: one per user conversation, created
//! lazily on first reference, held in memory for the process lifetime. The
//! [`SessionStage`] enum fixes the conversational progression; refine stages
//! may loop on themselves, everything else only advances forward.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::message::ChatMessage;
use crate::settings::TemplateSettings;

/// Built-in design principles applied when the client does not supply any.
pub const DEFAULT_DESIGN_PRINCIPLES: &str = "\
- Overall style: clean business aesthetic with a white background
- Copy first: drop decorative filler text, keep wording concise
- Avoid overly intricate graphics (scales, allegories); prefer SmartArt-like \
diagrams, simple block charts, and lists while keeping the information rich
- Use red sparingly, only for risk warnings
- No large solid color blocks
- White page background";

/// Position of a session in the fixed conversational progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStage {
    /// Waiting for the user's initial idea.
    Input,
    /// Idea received, outline not yet generated.
    Outline,
    /// Outline generated, looping on user feedback.
    OutlineRefine,
    /// Outline confirmed, style not yet generated.
    Style,
    /// Style generated, looping on user feedback.
    StyleRefine,
    /// Style confirmed, page images being generated.
    Generate,
    /// All pages attempted; accepts per-page edits without leaving this stage.
    Complete,
}

impl fmt::Display for SessionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStage::Input => write!(f, "input"),
            SessionStage::Outline => write!(f, "outline"),
            SessionStage::OutlineRefine => write!(f, "outline_refine"),
            SessionStage::Style => write!(f, "style"),
            SessionStage::StyleRefine => write!(f, "style_refine"),
            SessionStage::Generate => write!(f, "generate"),
            SessionStage::Complete => write!(f, "complete"),
        }
    }
}

impl FromStr for SessionStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "input" => Ok(SessionStage::Input),
            "outline" => Ok(SessionStage::Outline),
            "outline_refine" => Ok(SessionStage::OutlineRefine),
            "style" => Ok(SessionStage::Style),
            "style_refine" => Ok(SessionStage::StyleRefine),
            "generate" => Ok(SessionStage::Generate),
            "complete" => Ok(SessionStage::Complete),
            other => Err(format!("invalid session stage: '{other}'")),
        }
    }
}

/// One page of the outline: the content plan before any visual design exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlinePage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// One page of the design plan, index-aligned with the outline.
///
/// `prompt` is the raw image-generation instruction and is stripped from
/// client-facing views (see [`StylePageSummary`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylePage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub design_concept: String,
    #[serde(default)]
    pub prompt: String,
}

/// Client-facing view of a style page without the raw image prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylePageSummary {
    pub page: u32,
    pub theme: String,
    pub design_concept: String,
}

impl From<&StylePage> for StylePageSummary {
    fn from(page: &StylePage) -> Self {
        Self {
            page: page.page,
            theme: page.theme.clone(),
            design_concept: page.design_concept.clone(),
        }
    }
}

/// A successfully generated page image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub page: u32,
    pub theme: String,
    pub image_path: PathBuf,
    pub filename: String,
}

/// Kind of a user-supplied page material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    /// An image embedded verbatim into the generated page.
    Image,
    /// A tabular file whose extracted text travels in the prompt.
    Table,
    /// Pasted tabular text with no backing file.
    TableText,
}

impl fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaterialKind::Image => write!(f, "image"),
            MaterialKind::Table => write!(f, "table"),
            MaterialKind::TableText => write!(f, "table_text"),
        }
    }
}

/// A user-supplied material attached to a specific page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMaterial {
    pub filename: String,
    /// Backing file, absent for pasted table text.
    #[serde(default)]
    pub path: Option<PathBuf>,
    pub kind: MaterialKind,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_text: Option<String>,
}

/// How an uploaded exemplar image is applied during image generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    /// Loose stylistic inspiration.
    #[default]
    Reference,
    /// Strict design specification to replicate on every page.
    Template,
    /// A prior output to delta-edit against.
    Refine,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Reference => write!(f, "reference"),
            ReferenceKind::Template => write!(f, "template"),
            ReferenceKind::Refine => write!(f, "refine"),
        }
    }
}

impl FromStr for ReferenceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reference" => Ok(ReferenceKind::Reference),
            "template" => Ok(ReferenceKind::Template),
            "refine" => Ok(ReferenceKind::Refine),
            other => Err(format!("invalid reference kind: '{other}'")),
        }
    }
}

/// Color values extracted from a template image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateColors {
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub primary: Option<String>,
    #[serde(default)]
    pub secondary: Option<String>,
    #[serde(default)]
    pub accent: Option<String>,
    #[serde(default)]
    pub text_primary: Option<String>,
    #[serde(default)]
    pub text_secondary: Option<String>,
}

/// Font observations extracted from a template image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateFonts {
    #[serde(default)]
    pub title_style: Option<String>,
    #[serde(default)]
    pub title_size: Option<String>,
    #[serde(default)]
    pub body_style: Option<String>,
    #[serde(default)]
    pub body_size: Option<String>,
}

/// Layout observations extracted from a template image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateLayout {
    #[serde(default)]
    pub title_position: Option<String>,
    #[serde(default)]
    pub content_area: Option<String>,
    #[serde(default)]
    pub has_header: bool,
    #[serde(default)]
    pub has_footer: bool,
    #[serde(default)]
    pub has_sidebar: bool,
}

/// Background observations extracted from a template image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateBackground {
    /// Solid / gradient / image / pattern.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub has_decorations: bool,
    #[serde(default)]
    pub decoration_description: Option<String>,
}

/// Structured design specification derived from a template image.
///
/// Every field tolerates absence so a partially valid provider response
/// still yields a usable analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateAnalysis {
    #[serde(default)]
    pub colors: TemplateColors,
    #[serde(default)]
    pub fonts: TemplateFonts,
    #[serde(default)]
    pub layout: TemplateLayout,
    #[serde(default)]
    pub background: TemplateBackground,
    #[serde(default)]
    pub style_summary: Option<String>,
}

/// Metadata for an ingested supporting document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportDocument {
    pub filename: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
    pub text_length: usize,
}

/// The per-conversation session record.
///
/// Created on first reference with an opaque client-supplied identifier;
/// lives for the process lifetime. Stage-independent side inputs (transcript,
/// documents, materials, reference images) accumulate alongside the staged
/// outline/style/image pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub stage: SessionStage,
    pub user_input: String,
    pub outline: Vec<OutlinePage>,
    /// Verbatim provider rendering of the outline, kept as refinement context.
    pub outline_text: String,
    pub style: Vec<StylePage>,
    /// Verbatim provider rendering of the style plan, kept as refinement context.
    pub style_text: String,
    /// Sparse, index-aligned with `style`; `None` until a page's image exists.
    pub generated_images: Vec<Option<GeneratedImage>>,
    pub audio_transcript: String,
    pub support_docs_text: String,
    pub support_docs_files: Vec<SupportDocument>,
    /// Keyed by page index rendered as a string (wire format).
    pub page_materials: HashMap<String, Vec<PageMaterial>>,
    pub reference_image_path: Option<PathBuf>,
    pub reference_kind: ReferenceKind,
    pub template_analysis: Option<TemplateAnalysis>,
    pub custom_logo_path: Option<PathBuf>,
    pub page_count: Option<u32>,
    pub page_instructions: String,
    pub design_principles: String,
    pub template_settings: TemplateSettings,
    pub messages: Vec<ChatMessage>,
}

impl Session {
    /// Fresh session in the `Input` stage with built-in design principles.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            stage: SessionStage::Input,
            user_input: String::new(),
            outline: Vec::new(),
            outline_text: String::new(),
            style: Vec::new(),
            style_text: String::new(),
            generated_images: Vec::new(),
            audio_transcript: String::new(),
            support_docs_text: String::new(),
            support_docs_files: Vec::new(),
            page_materials: HashMap::new(),
            reference_image_path: None,
            reference_kind: ReferenceKind::default(),
            template_analysis: None,
            custom_logo_path: None,
            page_count: None,
            page_instructions: String::new(),
            design_principles: DEFAULT_DESIGN_PRINCIPLES.to_string(),
            template_settings: TemplateSettings::default(),
            messages: Vec::new(),
        }
    }

    /// Materials attached to a page, empty when none exist.
    pub fn materials_for_page(&self, page_index: usize) -> &[PageMaterial] {
        self.page_materials
            .get(&page_index.to_string())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Grow the sparse image list so `page_index` is addressable, then set it.
    pub fn set_generated_image(&mut self, page_index: usize, image: GeneratedImage) {
        if self.generated_images.len() <= page_index {
            self.generated_images.resize(page_index + 1, None);
        }
        self.generated_images[page_index] = Some(image);
    }

    /// The generated image for a page, when one exists.
    pub fn generated_image(&self, page_index: usize) -> Option<&GeneratedImage> {
        self.generated_images.get(page_index)?.as_ref()
    }
}
