//! Generation ports.
//!
//! Traits implemented by the infrastructure layer for the two provider
//! calls the state machine makes (text and image generation) plus the
//! single-shot template analysis. Provider failures never surface as
//! errors: each call resolves to a payload-plus-advisory outcome and the
//! machine decides whether state advances.

use std::future::Future;
use std::path::{Path, PathBuf};

use slidesmith_types::outcome::{ImageOutcome, TextOutcome};
use slidesmith_types::session::{PageMaterial, ReferenceKind, TemplateAnalysis};

/// One logical image-generation request.
///
/// `prompt` is the fully augmented instruction (see `prompt::image`); the
/// attachment paths tell the client which images to send alongside it. The
/// generated image is written to `output_path`.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub output_path: PathBuf,
    pub reference_image_path: Option<PathBuf>,
    pub reference_kind: ReferenceKind,
    pub custom_logo_path: Option<PathBuf>,
    pub template_analysis: Option<TemplateAnalysis>,
    pub page_materials: Vec<PageMaterial>,
}

/// Text generation with bounded retries behind the implementation.
pub trait TextGenerator: Send + Sync {
    fn generate_text(&self, prompt: &str) -> impl Future<Output = TextOutcome> + Send;
}

/// Image generation with bounded retries behind the implementation.
pub trait ImageGenerator: Send + Sync {
    fn generate_image(&self, request: &ImageRequest) -> impl Future<Output = ImageOutcome> + Send;
}

/// Single-shot structured design analysis of a reference image.
///
/// No retry; any failure yields `None` and the session simply carries no
/// analysis.
pub trait TemplateAnalyzer: Send + Sync {
    fn analyze_template(
        &self,
        image_path: &Path,
    ) -> impl Future<Output = Option<TemplateAnalysis>> + Send;
}
