//! Typed results returned by state machine operations.
//!
//! These are the shapes the serving layer maps onto wire responses. Style
//! entries are always exposed as [`StylePageSummary`] so the raw image
//! prompts never leave the backend.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use slidesmith_types::message::ChatMessage;
use slidesmith_types::session::{
    GeneratedImage, OutlinePage, SessionStage, StylePageSummary,
};
use slidesmith_types::settings::TemplateSettings;

/// Settings accepted alongside the idea when generating an outline.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateOutlineRequest {
    pub idea: String,
    #[serde(default)]
    pub page_count: Option<u32>,
    #[serde(default)]
    pub page_instructions: Option<String>,
    #[serde(default)]
    pub design_principles: Option<String>,
    #[serde(default)]
    pub template_settings: Option<TemplateSettings>,
}

/// A generated or revised outline.
#[derive(Debug, Clone, Serialize)]
pub struct OutlineResult {
    pub outline_text: String,
    pub outline: Vec<OutlinePage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

/// Outcome of an outline-refine message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefineOutline {
    /// The message matched the confirmation vocabulary; no provider call.
    Confirmed,
    /// The outline was revised.
    Revised(OutlineResult),
}

/// A generated or revised design plan, prompts stripped.
#[derive(Debug, Clone, Serialize)]
pub struct StyleResult {
    pub style_text: String,
    pub style: Vec<StylePageSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

/// Outcome of a style-refine message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefineStyle {
    Confirmed,
    Revised(StyleResult),
}

/// A single page's outcome within a batch generation run.
#[derive(Debug, Clone, Serialize)]
pub struct PageImageResult {
    pub page: u32,
    pub theme: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

/// Aggregate report of a generate-all-images run.
///
/// Per-page outcomes are independent; one page's failure never aborts the
/// remaining pages.
#[derive(Debug, Clone, Serialize)]
pub struct BatchImageReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<PageImageResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub advisories: Vec<String>,
}

/// A successful single-page image generation.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateImageResult {
    pub page_index: usize,
    pub image_path: PathBuf,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

/// A successful refine-and-regenerate of one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageRefineResult {
    pub updated_style: StylePageSummary,
    pub image_path: PathBuf,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

/// Stage-dependent reply of the unified chat entry point.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatReply {
    /// Idea received in `Input`; the outline was generated.
    Outline(OutlineResult),
    /// The outline was revised and awaits further feedback.
    OutlineRevised(OutlineResult),
    /// Outline confirmed; the design plan was generated.
    Style(StyleResult),
    /// The design plan was revised and awaits further feedback.
    StyleRevised(StyleResult),
    /// Style confirmed; all pages were generated.
    Generated(BatchImageReport),
    /// Generation already in progress; nothing to do.
    Generating { message: String },
    /// The deck is complete and the user asked to modify a specific page.
    EditingPage { page: u32, message: String },
    /// The deck is complete; acknowledgment with available actions.
    Complete { message: String },
}

/// Client-facing snapshot of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub stage: SessionStage,
    pub outline: Vec<OutlinePage>,
    pub style: Vec<StylePageSummary>,
    pub images: Vec<Option<GeneratedImage>>,
    pub messages: Vec<ChatMessage>,
    pub audio_transcript: String,
}
