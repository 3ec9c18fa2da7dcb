//! The session state machine.
//!
//! [`DeckMachine`] drives a session through the fixed conversational
//! progression (idea → outline → outline refine → style → style refine →
//! image generation → complete), deciding per inbound event which prompt to
//! build and which generation call to issue, and writing results back
//! through the session repository.
//!
//! Stage only advances on a syntactically valid provider response carrying
//! the expected JSON payload; provider failures leave the stage unchanged
//! while keeping the user's triggering message logged. The per-page
//! refine-and-regenerate operation is a side channel that never changes
//! stage.

pub mod output;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info, warn};

use slidesmith_types::error::SessionError;
use slidesmith_types::message::MessageRole;
use slidesmith_types::session::{
    MaterialKind, OutlinePage, PageMaterial, ReferenceKind, Session, SessionStage,
    StylePage, StylePageSummary, SupportDocument, TemplateAnalysis,
};

use crate::confirm::ConfirmClassifier;
use crate::generate::{ImageGenerator, ImageRequest, TemplateAnalyzer, TextGenerator};
use crate::parse;
use crate::prompt;
use crate::prompt::outline::OutlineInputs;
use crate::prompt::style::StyleInputs;
use crate::session::SessionRepository;

use output::{
    BatchImageReport, ChatReply, GenerateImageResult, GenerateOutlineRequest, OutlineResult,
    PageImageResult, PageRefineResult, RefineOutline, RefineStyle, SessionView, StyleResult,
};

/// Ingested documents are cut at this length before entering prompts.
const MAX_SUPPORT_DOC_CHARS: usize = 10_000;

/// The conversational session state machine, generic over its ports.
pub struct DeckMachine<R, T, I, A> {
    sessions: R,
    text: T,
    images: I,
    analyzer: A,
    output_dir: PathBuf,
}

impl<R, T, I, A> DeckMachine<R, T, I, A>
where
    R: SessionRepository,
    T: TextGenerator,
    I: ImageGenerator,
    A: TemplateAnalyzer,
{
    pub fn new(sessions: R, text: T, images: I, analyzer: A, output_dir: PathBuf) -> Self {
        Self {
            sessions,
            text,
            images,
            analyzer,
            output_dir,
        }
    }

    /// Access to the session repository (used by serving-layer views).
    pub fn sessions(&self) -> &R {
        &self.sessions
    }

    // -----------------------------------------------------------------
    // Stage 1: idea intake
    // -----------------------------------------------------------------

    /// Store the user's idea and move to the outline stage.
    pub async fn submit_idea(&self, session_id: &str, idea: &str) {
        let mut session = self.sessions.get_or_create(session_id).await;
        session.user_input = idea.to_string();
        session.stage = SessionStage::Outline;
        session
            .messages
            .push(slidesmith_types::message::ChatMessage::now(
                MessageRole::User,
                idea,
            ));
        self.sessions.save(session).await;
        info!(session_id, "idea received, moving to outline");
    }

    // -----------------------------------------------------------------
    // Stage 2-3: outline
    // -----------------------------------------------------------------

    /// Generate the outline from the idea plus accumulated side inputs.
    pub async fn generate_outline(
        &self,
        session_id: &str,
        request: GenerateOutlineRequest,
    ) -> Result<OutlineResult, SessionError> {
        let mut session = self.sessions.get_or_create(session_id).await;

        // Persist settings regardless of whether generation succeeds.
        if let Some(count) = request.page_count {
            session.page_count = Some(count);
        }
        if let Some(instructions) = &request.page_instructions {
            session.page_instructions = instructions.clone();
        }
        if let Some(principles) = &request.design_principles {
            session.design_principles = principles.clone();
        }
        if let Some(settings) = &request.template_settings {
            session.template_settings = settings.clone();
        }
        self.sessions.save(session.clone()).await;

        let inputs = OutlineInputs {
            idea: &request.idea,
            page_count: session.page_count,
            page_instructions: &session.page_instructions,
            audio_transcript: &session.audio_transcript,
            support_docs_text: &session.support_docs_text,
        };
        let outcome = self
            .text
            .generate_text(&prompt::outline::build_outline_prompt(&inputs))
            .await;

        if outcome.is_empty() {
            return Err(SessionError::generation(
                "outline generation failed",
                outcome.advisory,
            ));
        }

        let Some(pages) = parse::parse_outline_pages(&outcome.text) else {
            return Err(SessionError::unparsable(
                "outline response carried no parseable pages",
                outcome.text,
            ));
        };

        session.user_input = request.idea.clone();
        session.outline_text = outcome.text.clone();
        session.outline = pages.clone();
        session.stage = SessionStage::OutlineRefine;
        self.push_assistant(
            &mut session,
            outcome.advisory.as_deref(),
            format!(
                "Here is your slide outline:\n\n{}\n\nIf it looks right, reply 'confirm' to \
                 move on to the design plan; otherwise tell me what to change.",
                outcome.text
            ),
        );
        self.sessions.save(session).await;
        info!(session_id, pages = pages.len(), "outline generated");

        Ok(OutlineResult {
            outline_text: outcome.text,
            outline: pages,
            advisory: outcome.advisory,
        })
    }

    /// Apply user feedback to the outline, or confirm it.
    pub async fn refine_outline(
        &self,
        session_id: &str,
        feedback: &str,
    ) -> Result<RefineOutline, SessionError> {
        let feedback = feedback.trim();
        if feedback.is_empty() {
            return Err(SessionError::EmptyFeedback);
        }

        self.sessions
            .append_message(session_id, MessageRole::User, feedback)
            .await;
        let mut session = self.sessions.get_or_create(session_id).await;

        if ConfirmClassifier::outline().matches(feedback) {
            session.stage = SessionStage::Style;
            self.push_assistant(
                &mut session,
                None,
                "Outline confirmed. Generating the design plan...".to_string(),
            );
            self.sessions.save(session).await;
            return Ok(RefineOutline::Confirmed);
        }

        let outcome = self
            .text
            .generate_text(&prompt::outline::build_outline_refine_prompt(
                &session.outline_text,
                feedback,
            ))
            .await;

        if outcome.is_empty() {
            return Err(SessionError::generation(
                "outline revision failed",
                outcome.advisory,
            ));
        }
        let Some(pages) = parse::parse_outline_pages(&outcome.text) else {
            return Err(SessionError::unparsable(
                "outline revision carried no parseable pages",
                outcome.text,
            ));
        };

        session.outline_text = outcome.text.clone();
        session.outline = pages.clone();
        session.stage = SessionStage::OutlineRefine;
        self.push_assistant(
            &mut session,
            outcome.advisory.as_deref(),
            format!(
                "I've revised the outline based on your feedback:\n\n{}\n\nConfirm when \
                 you're happy, or keep the adjustments coming.",
                outcome.text
            ),
        );
        self.sessions.save(session).await;

        Ok(RefineOutline::Revised(OutlineResult {
            outline_text: outcome.text,
            outline: pages,
            advisory: outcome.advisory,
        }))
    }

    /// Explicit outline confirmation, bypassing the vocabulary heuristic.
    pub async fn confirm_outline(&self, session_id: &str) {
        let mut session = self.sessions.get_or_create(session_id).await;
        session.stage = SessionStage::Style;
        self.push_assistant(
            &mut session,
            None,
            "Outline confirmed. Generating the design plan...".to_string(),
        );
        self.sessions.save(session).await;
    }

    /// Replace the outline with an externally edited structured form and
    /// regenerate the text rendering deterministically.
    pub async fn update_outline(&self, session_id: &str, outline: Vec<OutlinePage>) {
        let mut session = self.sessions.get_or_create(session_id).await;
        session.outline_text = prompt::render_outline_text(&outline);
        session.outline = outline;
        self.sessions.save(session).await;
        debug!(session_id, "outline replaced by external edit");
    }

    // -----------------------------------------------------------------
    // Stage 4-5: style
    // -----------------------------------------------------------------

    /// Generate the per-page design plan from the confirmed outline.
    pub async fn generate_style(&self, session_id: &str) -> Result<StyleResult, SessionError> {
        let mut session = self.sessions.get_or_create(session_id).await;
        if session.outline.is_empty() {
            return Err(SessionError::MissingOutline);
        }

        let mut principles = session.design_principles.clone();
        if let Some(richness) = &session.template_settings.content_richness {
            if !richness.prompt.is_empty() {
                principles.push_str(&format!("\n\n[Content style]\n{}", richness.prompt));
            }
        }

        let inputs = StyleInputs {
            outline: &session.outline,
            design_principles: &principles,
            color_scheme: session.template_settings.color_scheme.as_ref(),
            font_scheme: session.template_settings.font_scheme.as_ref(),
            placement: session.template_settings.page_number_placement,
        };
        let outcome = self
            .text
            .generate_text(&prompt::style::build_style_prompt(&inputs))
            .await;

        if outcome.is_empty() {
            return Err(SessionError::generation(
                "design plan generation failed",
                outcome.advisory,
            ));
        }
        let Some(pages) = parse::parse_style_pages(&outcome.text) else {
            return Err(SessionError::unparsable(
                "design plan response carried no parseable pages",
                outcome.text,
            ));
        };
        // Each style page corresponds 1:1 to an outline page.
        if pages.len() != session.outline.len() {
            return Err(SessionError::unparsable(
                format!(
                    "design plan has {} pages but the outline has {}",
                    pages.len(),
                    session.outline.len()
                ),
                outcome.text,
            ));
        }

        session.style_text = outcome.text.clone();
        session.style = pages.clone();
        session.stage = SessionStage::StyleRefine;

        let summary = pages
            .iter()
            .map(|p| {
                format!(
                    "**Page {}: {}**\nDesign rationale: {}",
                    p.page, p.theme, p.design_concept
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        self.push_assistant(
            &mut session,
            outcome.advisory.as_deref(),
            format!(
                "Here is the design plan:\n\n{summary}\n\nReply 'generate' to start producing \
                 the page images, or tell me what to adjust."
            ),
        );
        self.sessions.save(session).await;
        info!(session_id, pages = pages.len(), "design plan generated");

        Ok(StyleResult {
            style_text: outcome.text,
            style: pages.iter().map(StylePageSummary::from).collect(),
            advisory: outcome.advisory,
        })
    }

    /// Apply user feedback to the design plan, or confirm it.
    pub async fn refine_style(
        &self,
        session_id: &str,
        feedback: &str,
    ) -> Result<RefineStyle, SessionError> {
        let feedback = feedback.trim();
        if feedback.is_empty() {
            return Err(SessionError::EmptyFeedback);
        }

        self.sessions
            .append_message(session_id, MessageRole::User, feedback)
            .await;
        let mut session = self.sessions.get_or_create(session_id).await;

        if ConfirmClassifier::style().matches(feedback) {
            session.stage = SessionStage::Generate;
            self.push_assistant(
                &mut session,
                None,
                "Design plan confirmed. Generating page images one by one...".to_string(),
            );
            self.sessions.save(session).await;
            return Ok(RefineStyle::Confirmed);
        }

        let outcome = self
            .text
            .generate_text(&prompt::style::build_style_refine_prompt(
                &session.style_text,
                feedback,
            ))
            .await;

        if outcome.is_empty() {
            return Err(SessionError::generation(
                "design plan revision failed",
                outcome.advisory,
            ));
        }
        let Some(pages) = parse::parse_style_pages(&outcome.text) else {
            return Err(SessionError::unparsable(
                "design plan revision carried no parseable pages",
                outcome.text,
            ));
        };

        session.style_text = outcome.text.clone();
        session.style = pages.clone();
        session.stage = SessionStage::StyleRefine;
        self.push_assistant(
            &mut session,
            outcome.advisory.as_deref(),
            "I've revised the design plan based on your feedback. Reply 'generate' to start \
             producing the page images, or keep adjusting."
                .to_string(),
        );
        self.sessions.save(session).await;

        Ok(RefineStyle::Revised(StyleResult {
            style_text: outcome.text,
            style: pages.iter().map(StylePageSummary::from).collect(),
            advisory: outcome.advisory,
        }))
    }

    /// Explicit style confirmation, bypassing the vocabulary heuristic.
    pub async fn confirm_style(&self, session_id: &str) {
        let mut session = self.sessions.get_or_create(session_id).await;
        session.stage = SessionStage::Generate;
        self.push_assistant(
            &mut session,
            None,
            "Design plan confirmed. Generating page images one by one...".to_string(),
        );
        self.sessions.save(session).await;
    }

    // -----------------------------------------------------------------
    // Stage 6: image generation
    // -----------------------------------------------------------------

    /// Generate the image for a single page.
    pub async fn generate_image(
        &self,
        session_id: &str,
        page_index: usize,
    ) -> Result<GenerateImageResult, SessionError> {
        let mut session = self.sessions.get_or_create(session_id).await;
        let page_style = Self::style_page(&session, page_index)?.clone();
        if page_style.prompt.is_empty() {
            return Err(SessionError::MissingPrompt {
                page: page_index as u32 + 1,
            });
        }

        let request = self.image_request(&session, &page_style, page_index);
        let outcome = self.images.generate_image(&request).await;
        let page_num = page_index as u32 + 1;

        if !outcome.saved {
            let notice = match &outcome.advisory {
                Some(advisory) => format!("Page {page_num} failed to generate. {advisory}"),
                None => format!("Page {page_num} failed to generate."),
            };
            self.sessions
                .append_message(session_id, MessageRole::Assistant, &notice)
                .await;
            return Err(SessionError::generation(
                format!("image generation failed for page {page_num}"),
                outcome.advisory,
            ));
        }

        let filename = self.page_filename(session_id, page_num);
        session.set_generated_image(
            page_index,
            slidesmith_types::session::GeneratedImage {
                page: page_num,
                theme: page_style.theme.clone(),
                image_path: request.output_path.clone(),
                filename: filename.clone(),
            },
        );
        self.push_assistant(
            &mut session,
            outcome.advisory.as_deref(),
            format!("Page {page_num} generated."),
        );
        self.sessions.save(session).await;

        Ok(GenerateImageResult {
            page_index,
            image_path: request.output_path,
            filename,
            advisory: outcome.advisory,
        })
    }

    /// Generate all page images, strictly sequentially.
    ///
    /// Page N+1's request is not issued until page N's attempt sequence
    /// (including retries and delays) has fully resolved. Per-page failures
    /// are independent; the stage moves to `Complete` after the loop either
    /// way.
    pub async fn generate_all_images(
        &self,
        session_id: &str,
    ) -> Result<BatchImageReport, SessionError> {
        let mut session = self.sessions.get_or_create(session_id).await;
        if session.style.is_empty() {
            return Err(SessionError::MissingStyle);
        }

        session.stage = SessionStage::Generate;
        self.sessions.save(session.clone()).await;

        let style_pages = session.style.clone();
        let mut results = Vec::with_capacity(style_pages.len());
        let mut advisories = Vec::new();

        for (i, page_style) in style_pages.iter().enumerate() {
            let page_num = i as u32 + 1;

            if page_style.prompt.is_empty() {
                results.push(PageImageResult {
                    page: page_num,
                    theme: page_style.theme.clone(),
                    success: false,
                    image_path: None,
                    filename: None,
                    error: Some("page has no generation prompt".to_string()),
                    advisory: None,
                });
                continue;
            }

            let request = self.image_request(&session, page_style, i);
            let outcome = self.images.generate_image(&request).await;

            if let Some(advisory) = &outcome.advisory {
                advisories.push(format!("page {page_num}: {advisory}"));
            }

            if outcome.saved {
                let filename = self.page_filename(session_id, page_num);
                session.set_generated_image(
                    i,
                    slidesmith_types::session::GeneratedImage {
                        page: page_num,
                        theme: page_style.theme.clone(),
                        image_path: request.output_path.clone(),
                        filename: filename.clone(),
                    },
                );
                // Save per page so clients polling the session see progress.
                self.sessions.save(session.clone()).await;
                results.push(PageImageResult {
                    page: page_num,
                    theme: page_style.theme.clone(),
                    success: true,
                    image_path: Some(request.output_path),
                    filename: Some(filename),
                    error: None,
                    advisory: outcome.advisory,
                });
            } else {
                results.push(PageImageResult {
                    page: page_num,
                    theme: page_style.theme.clone(),
                    success: false,
                    image_path: None,
                    filename: None,
                    error: Some("image generation failed".to_string()),
                    advisory: outcome.advisory,
                });
            }
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        let failed = results.len() - succeeded;

        session.stage = SessionStage::Complete;
        let mut notice = format!(
            "All {} pages processed: {succeeded} succeeded, {failed} failed.\n\nYou can \
             download the deck now, or say 'modify page N' to touch up a page.",
            style_pages.len()
        );
        if !advisories.is_empty() {
            notice = format!(
                "The provider was unstable during generation:\n{}\n\n{notice}",
                advisories.join("\n")
            );
        }
        self.push_assistant(&mut session, None, notice);
        self.sessions.save(session).await;
        info!(session_id, succeeded, failed, "batch generation finished");

        Ok(BatchImageReport {
            total: style_pages.len(),
            succeeded,
            failed,
            results,
            advisories,
        })
    }

    /// Refine a single page's design and regenerate only its image.
    ///
    /// Never changes stage. When the page already has a generated image,
    /// that image becomes the delta-edit baseline.
    pub async fn refine_page(
        &self,
        session_id: &str,
        page_index: usize,
        feedback: &str,
    ) -> Result<PageRefineResult, SessionError> {
        let feedback = feedback.trim();
        if feedback.is_empty() {
            return Err(SessionError::EmptyFeedback);
        }

        let mut session = self.sessions.get_or_create(session_id).await;
        let current = Self::style_page(&session, page_index)?.clone();
        let page_num = page_index as u32 + 1;

        let outcome = self
            .text
            .generate_text(&prompt::style::build_page_refine_prompt(
                page_num,
                &current.theme,
                &current.design_concept,
                &current.prompt,
                feedback,
            ))
            .await;

        if outcome.is_empty() {
            return Err(SessionError::generation(
                format!("page {page_num} revision failed"),
                outcome.advisory,
            ));
        }
        let Some(parsed) = parse::parse_single_style_page(&outcome.text) else {
            return Err(SessionError::unparsable(
                format!("page {page_num} revision carried no parseable design"),
                outcome.text,
            ));
        };

        let updated = StylePage {
            page: page_num,
            theme: if parsed.theme.is_empty() {
                current.theme.clone()
            } else {
                parsed.theme
            },
            design_concept: parsed.design_concept,
            prompt: parsed.prompt,
        };
        session.style[page_index] = updated.clone();
        // The revised design sticks even if the image regeneration below fails.
        self.sessions.save(session.clone()).await;

        let baseline = session
            .generated_image(page_index)
            .map(|img| img.image_path.clone());
        let (image_prompt, reference_path, reference_kind) = match &baseline {
            Some(path) => (
                prompt::image::wrap_refine_image_prompt(&updated.prompt, feedback),
                Some(path.clone()),
                ReferenceKind::Refine,
            ),
            None => (
                updated.prompt.clone(),
                session.reference_image_path.clone(),
                session.reference_kind,
            ),
        };
        let full_prompt = prompt::image::build_image_prompt(
            &image_prompt,
            session.custom_logo_path.is_some(),
            reference_path.is_some(),
            reference_kind,
            session.template_analysis.as_ref(),
            &[],
        );

        let filename = self.page_filename(session_id, page_num);
        let request = ImageRequest {
            prompt: full_prompt,
            output_path: self.output_dir.join(&filename),
            reference_image_path: reference_path,
            reference_kind,
            custom_logo_path: session.custom_logo_path.clone(),
            template_analysis: session.template_analysis.clone(),
            page_materials: Vec::new(),
        };
        let image_outcome = self.images.generate_image(&request).await;

        let advisory = combine_advisories(&outcome.advisory, &image_outcome.advisory);
        if !image_outcome.saved {
            return Err(SessionError::generation(
                format!("image regeneration failed for page {page_num}"),
                advisory,
            ));
        }

        session.set_generated_image(
            page_index,
            slidesmith_types::session::GeneratedImage {
                page: page_num,
                theme: updated.theme.clone(),
                image_path: request.output_path.clone(),
                filename: filename.clone(),
            },
        );
        self.push_assistant(
            &mut session,
            advisory.as_deref(),
            format!("Page {page_num} updated per your feedback."),
        );
        self.sessions.save(session).await;

        Ok(PageRefineResult {
            updated_style: StylePageSummary::from(&updated),
            image_path: request.output_path,
            filename,
            advisory,
        })
    }

    // -----------------------------------------------------------------
    // Unified chat entry point
    // -----------------------------------------------------------------

    /// Dispatch a chat message according to the session's current stage.
    pub async fn unified_chat(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<ChatReply, SessionError> {
        let session = self.sessions.get_or_create(session_id).await;

        match session.stage {
            SessionStage::Input => {
                self.sessions
                    .append_message(session_id, MessageRole::User, message)
                    .await;
                let result = self
                    .generate_outline(
                        session_id,
                        GenerateOutlineRequest {
                            idea: message.to_string(),
                            ..Default::default()
                        },
                    )
                    .await?;
                Ok(ChatReply::Outline(result))
            }

            SessionStage::Outline | SessionStage::OutlineRefine => {
                match self.refine_outline(session_id, message).await? {
                    RefineOutline::Confirmed => {
                        let style = self.generate_style(session_id).await?;
                        Ok(ChatReply::Style(style))
                    }
                    RefineOutline::Revised(result) => Ok(ChatReply::OutlineRevised(result)),
                }
            }

            SessionStage::Style | SessionStage::StyleRefine => {
                match self.refine_style(session_id, message).await? {
                    RefineStyle::Confirmed => {
                        let report = self.generate_all_images(session_id).await?;
                        Ok(ChatReply::Generated(report))
                    }
                    RefineStyle::Revised(result) => Ok(ChatReply::StyleRevised(result)),
                }
            }

            SessionStage::Generate => {
                self.sessions
                    .append_message(session_id, MessageRole::User, message)
                    .await;
                let notice = "Pages are being generated, please wait...".to_string();
                self.sessions
                    .append_message(session_id, MessageRole::Assistant, &notice)
                    .await;
                Ok(ChatReply::Generating { message: notice })
            }

            SessionStage::Complete => {
                self.sessions
                    .append_message(session_id, MessageRole::User, message)
                    .await;
                if let Some(page) = extract_modify_page(message) {
                    let notice =
                        format!("Tell me how you'd like page {page} changed.");
                    self.sessions
                        .append_message(session_id, MessageRole::Assistant, &notice)
                        .await;
                    return Ok(ChatReply::EditingPage {
                        page,
                        message: notice,
                    });
                }
                let notice = "Your deck is complete.\n- To touch up a page, say 'modify \
                              page N'\n- Use the download button to export the deck"
                    .to_string();
                self.sessions
                    .append_message(session_id, MessageRole::Assistant, &notice)
                    .await;
                Ok(ChatReply::Complete { message: notice })
            }
        }
    }

    // -----------------------------------------------------------------
    // Side-input ingestion
    // -----------------------------------------------------------------

    /// Attach (or replace) the session's audio transcript.
    pub async fn attach_audio_transcript(
        &self,
        session_id: &str,
        transcript: &str,
    ) -> Result<(), SessionError> {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Err(SessionError::EmptyTranscript);
        }
        let mut session = self.sessions.get_or_create(session_id).await;
        session.audio_transcript = transcript.to_string();
        self.push_assistant(
            &mut session,
            None,
            format!(
                "Audio transcript attached ({} chars). It will feed into the outline.",
                transcript.chars().count()
            ),
        );
        self.sessions.save(session).await;
        Ok(())
    }

    /// Ingest an extracted supporting document.
    ///
    /// The text is truncated to a fixed length before it can enter prompts,
    /// prefixed with its filename, and accumulated across documents.
    pub async fn attach_support_document(
        &self,
        session_id: &str,
        filename: &str,
        path: Option<PathBuf>,
        extracted_text: &str,
    ) -> Result<usize, SessionError> {
        let text = extracted_text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyDocumentText);
        }

        let mut text = text.to_string();
        if text.len() > MAX_SUPPORT_DOC_CHARS {
            let mut cut = MAX_SUPPORT_DOC_CHARS;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
            text.push_str("\n...(document truncated)");
        }
        let text_length = text.chars().count();

        let mut session = self.sessions.get_or_create(session_id).await;
        let block = format!("--- {filename} ---\n{text}");
        if session.support_docs_text.is_empty() {
            session.support_docs_text = block;
        } else {
            session.support_docs_text.push_str("\n\n");
            session.support_docs_text.push_str(&block);
        }
        session.support_docs_files.push(SupportDocument {
            filename: filename.to_string(),
            path,
            text_length,
        });
        self.push_assistant(
            &mut session,
            None,
            format!("Document \"{filename}\" ingested ({text_length} chars extracted)."),
        );
        self.sessions.save(session).await;
        Ok(text_length)
    }

    /// Drop all ingested supporting documents.
    pub async fn clear_support_documents(&self, session_id: &str) {
        let mut session = self.sessions.get_or_create(session_id).await;
        session.support_docs_text.clear();
        session.support_docs_files.clear();
        self.sessions.save(session).await;
    }

    /// Attach a material to a page, validated against the current outline.
    pub async fn attach_page_material(
        &self,
        session_id: &str,
        page_index: usize,
        material: PageMaterial,
    ) -> Result<usize, SessionError> {
        let mut session = self.sessions.get_or_create(session_id).await;
        if page_index >= session.outline.len() {
            return Err(SessionError::PageOutOfRange {
                index: page_index,
                pages: session.outline.len(),
            });
        }
        if material.kind == MaterialKind::TableText
            && material.table_text.as_deref().unwrap_or("").trim().is_empty()
        {
            return Err(SessionError::EmptyTableText);
        }

        let page_title = session.outline[page_index].title.clone();
        let kind_label = match material.kind {
            MaterialKind::Image => "Image",
            MaterialKind::Table | MaterialKind::TableText => "Table",
        };
        let filename = material.filename.clone();

        let materials = session
            .page_materials
            .entry(page_index.to_string())
            .or_default();
        materials.push(material);
        let count = materials.len();

        self.push_assistant(
            &mut session,
            None,
            format!(
                "{kind_label} \"{filename}\" added to page {} ({page_title}).",
                page_index + 1
            ),
        );
        self.sessions.save(session).await;
        Ok(count)
    }

    /// Remove one material from a page, deleting its backing file.
    ///
    /// This is the only place the session layer deletes a file; everything
    /// else on disk belongs to the upload collaborators.
    pub async fn remove_page_material(
        &self,
        session_id: &str,
        page_index: usize,
        material_index: usize,
    ) -> Result<PageMaterial, SessionError> {
        let mut session = self.sessions.get_or_create(session_id).await;
        let count = session.materials_for_page(page_index).len();
        if material_index >= count {
            return Err(SessionError::MaterialOutOfRange {
                index: material_index,
                count,
            });
        }

        let removed = session
            .page_materials
            .get_mut(&page_index.to_string())
            .expect("non-empty material list checked above")
            .remove(material_index);
        if let Some(path) = &removed.path {
            if let Err(err) = tokio::fs::remove_file(path).await {
                warn!(path = %path.display(), %err, "failed to delete removed material file");
            }
        }
        self.sessions.save(session).await;
        Ok(removed)
    }

    /// Materials attached to one page.
    pub async fn page_materials(&self, session_id: &str, page_index: usize) -> Vec<PageMaterial> {
        let session = self.sessions.get_or_create(session_id).await;
        session.materials_for_page(page_index).to_vec()
    }

    // -----------------------------------------------------------------
    // Reference / template / logo ingestion
    // -----------------------------------------------------------------

    /// Store a reference image; template kind triggers the analysis call.
    pub async fn set_reference_image(
        &self,
        session_id: &str,
        path: &Path,
        kind: ReferenceKind,
    ) -> Option<TemplateAnalysis> {
        let mut session = self.sessions.get_or_create(session_id).await;
        session.reference_image_path = Some(path.to_path_buf());
        session.reference_kind = kind;

        let analysis = if kind == ReferenceKind::Template {
            let analysis = self.analyzer.analyze_template(path).await;
            if analysis.is_some() {
                info!(session_id, "template analysis stored");
                session.template_analysis = analysis.clone();
            }
            analysis
        } else {
            None
        };

        self.sessions.save(session).await;
        analysis
    }

    /// Store the user's custom logo.
    pub async fn set_logo(&self, session_id: &str, path: &Path) {
        let mut session = self.sessions.get_or_create(session_id).await;
        session.custom_logo_path = Some(path.to_path_buf());
        self.sessions.save(session).await;
    }

    // -----------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------

    /// Client-facing snapshot of a session.
    pub async fn session_view(&self, session_id: &str) -> SessionView {
        let session = self.sessions.get_or_create(session_id).await;
        SessionView {
            session_id: session.id.clone(),
            stage: session.stage,
            outline: session.outline.clone(),
            style: session.style.iter().map(StylePageSummary::from).collect(),
            images: session.generated_images.clone(),
            messages: session.messages.clone(),
            audio_transcript: session.audio_transcript.clone(),
        }
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    fn style_page<'s>(
        session: &'s Session,
        page_index: usize,
    ) -> Result<&'s StylePage, SessionError> {
        if session.style.is_empty() {
            return Err(SessionError::MissingStyle);
        }
        session
            .style
            .get(page_index)
            .ok_or(SessionError::PageOutOfRange {
                index: page_index,
                pages: session.style.len(),
            })
    }

    fn image_request(
        &self,
        session: &Session,
        page_style: &StylePage,
        page_index: usize,
    ) -> ImageRequest {
        let materials = session.materials_for_page(page_index).to_vec();
        let full_prompt = prompt::image::build_image_prompt(
            &page_style.prompt,
            session.custom_logo_path.is_some(),
            session.reference_image_path.is_some(),
            session.reference_kind,
            session.template_analysis.as_ref(),
            &materials,
        );
        let filename = self.page_filename(&session.id, page_index as u32 + 1);
        ImageRequest {
            prompt: full_prompt,
            output_path: self.output_dir.join(filename),
            reference_image_path: session.reference_image_path.clone(),
            reference_kind: session.reference_kind,
            custom_logo_path: session.custom_logo_path.clone(),
            template_analysis: session.template_analysis.clone(),
            page_materials: materials,
        }
    }

    fn page_filename(&self, session_id: &str, page_num: u32) -> String {
        format!("{session_id}_page_{page_num}.jpg")
    }

    fn push_assistant(&self, session: &mut Session, advisory: Option<&str>, body: String) {
        let content = match advisory {
            Some(advisory) => format!("{advisory}\n\n{body}"),
            None => body,
        };
        session
            .messages
            .push(slidesmith_types::message::ChatMessage::now(
                MessageRole::Assistant,
                content,
            ));
    }
}

/// Extract the page number from a "modify page N" chat message.
pub fn extract_modify_page(message: &str) -> Option<u32> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN
        .get_or_init(|| Regex::new(r"(?i)modify\s+page\s*(\d+)").expect("valid regex"));
    re.captures(message)?.get(1)?.as_str().parse().ok()
}

/// Join the text-call and image-call advisories of a combined operation.
fn combine_advisories(first: &Option<String>, second: &Option<String>) -> Option<String> {
    match (first, second) {
        (Some(a), Some(b)) => Some(format!("{a}\n{b}")),
        (Some(a), None) => Some(a.clone()),
        (None, Some(b)) => Some(b.clone()),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    use slidesmith_types::message::ChatMessage;
    use slidesmith_types::outcome::{ImageOutcome, TextOutcome};

    // -------------------------------------------------------------------
    // Mock ports
    // -------------------------------------------------------------------

    #[derive(Default)]
    struct TestSessions {
        inner: Mutex<HashMap<String, Session>>,
    }

    impl SessionRepository for TestSessions {
        async fn get_or_create(&self, id: &str) -> Session {
            self.inner
                .lock()
                .unwrap()
                .entry(id.to_string())
                .or_insert_with(|| Session::new(id))
                .clone()
        }

        async fn save(&self, session: Session) {
            self.inner
                .lock()
                .unwrap()
                .insert(session.id.clone(), session);
        }

        async fn append_message(&self, id: &str, role: MessageRole, content: &str) {
            self.inner
                .lock()
                .unwrap()
                .entry(id.to_string())
                .or_insert_with(|| Session::new(id))
                .messages
                .push(ChatMessage::now(role, content));
        }

        async fn len(&self) -> usize {
            self.inner.lock().unwrap().len()
        }
    }

    #[derive(Clone, Default)]
    struct ScriptedText {
        replies: Arc<Mutex<VecDeque<TextOutcome>>>,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedText {
        fn with_replies(replies: Vec<TextOutcome>) -> Self {
            Self {
                replies: Arc::new(Mutex::new(replies.into())),
                prompts: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn call_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    impl TextGenerator for ScriptedText {
        async fn generate_text(&self, prompt: &str) -> TextOutcome {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| TextOutcome::failed("no scripted reply left"))
        }
    }

    #[derive(Clone, Default)]
    struct ScriptedImages {
        fail: bool,
        requests: Arc<Mutex<Vec<ImageRequest>>>,
    }

    impl ScriptedImages {
        fn failing() -> Self {
            Self {
                fail: true,
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn requests(&self) -> Vec<ImageRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl ImageGenerator for ScriptedImages {
        async fn generate_image(&self, request: &ImageRequest) -> ImageOutcome {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                ImageOutcome::failed("image generation failed after 3 attempts: timeout")
            } else {
                ImageOutcome::ok()
            }
        }
    }

    struct NoAnalyzer;

    impl TemplateAnalyzer for NoAnalyzer {
        async fn analyze_template(&self, _image_path: &Path) -> Option<TemplateAnalysis> {
            None
        }
    }

    #[derive(Clone)]
    struct FixedAnalyzer(TemplateAnalysis);

    impl TemplateAnalyzer for FixedAnalyzer {
        async fn analyze_template(&self, _image_path: &Path) -> Option<TemplateAnalysis> {
            Some(self.0.clone())
        }
    }

    type TestMachine = DeckMachine<TestSessions, ScriptedText, ScriptedImages, NoAnalyzer>;

    fn machine_with(replies: Vec<TextOutcome>, images: ScriptedImages) -> (TestMachine, ScriptedText, ScriptedImages) {
        let text = ScriptedText::with_replies(replies);
        let machine = DeckMachine::new(
            TestSessions::default(),
            text.clone(),
            images.clone(),
            NoAnalyzer,
            PathBuf::from("out"),
        );
        (machine, text, images)
    }

    fn machine(replies: Vec<TextOutcome>) -> (TestMachine, ScriptedText, ScriptedImages) {
        machine_with(replies, ScriptedImages::default())
    }

    fn outline_reply(pages: usize) -> TextOutcome {
        let entries = (1..=pages)
            .map(|n| {
                format!(
                    r#"{{"page": {n}, "theme": "theme {n}", "title": "Title {n}", "content": "points {n}"}}"#
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        TextOutcome::ok(format!(
            "Here is the outline.\n```json\n{{\"pages\": [{entries}]}}\n```"
        ))
    }

    fn style_reply(pages: usize) -> TextOutcome {
        let entries = (1..=pages)
            .map(|n| {
                format!(
                    r#"{{"page": {n}, "theme": "theme {n}", "design_concept": "concept {n}", "prompt": "render page {n}"}}"#
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        TextOutcome::ok(format!("```json\n{{\"pages\": [{entries}]}}\n```"))
    }

    async fn stage_of(machine: &TestMachine, id: &str) -> SessionStage {
        machine.sessions().get_or_create(id).await.stage
    }

    /// Drive a session to the point where a 1:1 outline exists.
    async fn with_outline(machine: &TestMachine, id: &str, pages: usize) {
        machine.submit_idea(id, "an idea").await;
        machine
            .generate_outline(
                id,
                GenerateOutlineRequest {
                    idea: "an idea".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            machine.sessions().get_or_create(id).await.outline.len(),
            pages
        );
    }

    // -------------------------------------------------------------------
    // Idea intake and outline
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn test_submit_idea_moves_to_outline_and_logs() {
        let (machine, _, _) = machine(vec![]);
        machine.submit_idea("s1", "quarterly strategy review").await;

        let session = machine.sessions().get_or_create("s1").await;
        assert_eq!(session.stage, SessionStage::Outline);
        assert_eq!(session.user_input, "quarterly strategy review");
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].role, MessageRole::User);
    }

    #[tokio::test]
    async fn test_generate_outline_success_advances_stage() {
        let (machine, _, _) = machine(vec![outline_reply(3)]);
        machine.submit_idea("s1", "idea").await;

        let result = machine
            .generate_outline(
                "s1",
                GenerateOutlineRequest {
                    idea: "idea".to_string(),
                    page_count: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(result.outline.len(), 3);
        assert!(result.advisory.is_none());
        let session = machine.sessions().get_or_create("s1").await;
        assert_eq!(session.stage, SessionStage::OutlineRefine);
        assert_eq!(session.page_count, Some(3));
        assert_eq!(session.outline_text, result.outline_text);
    }

    #[tokio::test]
    async fn test_generate_outline_terminal_failure_keeps_stage() {
        let (machine, _, _) = machine(vec![TextOutcome::failed(
            "failed after 3 attempts: request timed out",
        )]);
        machine.submit_idea("s1", "idea").await;

        let err = machine
            .generate_outline(
                "s1",
                GenerateOutlineRequest {
                    idea: "idea".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        match err {
            SessionError::Generation { advisory, .. } => {
                assert!(advisory.unwrap().contains("3 attempts"));
            }
            other => panic!("expected Generation, got {other:?}"),
        }
        assert_eq!(stage_of(&machine, "s1").await, SessionStage::Outline);
    }

    #[tokio::test]
    async fn test_generate_outline_unparseable_preserves_raw() {
        let (machine, _, _) = machine(vec![TextOutcome::ok("prose with no json at all")]);
        machine.submit_idea("s1", "idea").await;

        let err = machine
            .generate_outline(
                "s1",
                GenerateOutlineRequest {
                    idea: "idea".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        match err {
            SessionError::Unparsable { raw, .. } => {
                assert_eq!(raw, "prose with no json at all");
            }
            other => panic!("expected Unparsable, got {other:?}"),
        }
        assert_eq!(stage_of(&machine, "s1").await, SessionStage::Outline);
    }

    #[tokio::test]
    async fn test_outline_prompt_merges_transcript_and_docs() {
        let (machine, text, _) = machine(vec![outline_reply(1)]);
        machine
            .attach_audio_transcript("s1", "speaker 1: focus on growth")
            .await
            .unwrap();
        machine
            .attach_support_document("s1", "notes.txt", None, "revenue doubled")
            .await
            .unwrap();

        machine
            .generate_outline(
                "s1",
                GenerateOutlineRequest {
                    idea: "idea".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let prompt = text.last_prompt();
        assert!(prompt.contains("speaker 1: focus on growth"));
        assert!(prompt.contains("--- notes.txt ---"));
        assert!(prompt.contains("revenue doubled"));
    }

    #[tokio::test]
    async fn test_refine_outline_confirm_skips_provider_call() {
        let (machine, text, _) = machine(vec![outline_reply(2)]);
        with_outline(&machine, "s1", 2).await;
        let calls_before = text.call_count();

        let outcome = machine.refine_outline("s1", "confirm").await.unwrap();
        assert!(matches!(outcome, RefineOutline::Confirmed));
        assert_eq!(text.call_count(), calls_before);
        assert_eq!(stage_of(&machine, "s1").await, SessionStage::Style);
    }

    #[tokio::test]
    async fn test_confirmation_transitions_exactly_once() {
        let (machine, text, _) = machine(vec![outline_reply(1)]);
        with_outline(&machine, "s1", 1).await;

        let outcome = machine.refine_outline("s1", "confirm").await.unwrap();
        assert!(matches!(outcome, RefineOutline::Confirmed));
        assert_eq!(stage_of(&machine, "s1").await, SessionStage::Style);

        // The second "confirm" lands in Style; the chat dispatcher routes it
        // to the style path, which cannot be an outline confirmation. With no
        // style plan yet it fails the generation precondition instead.
        let calls_before = text.call_count();
        let err = machine.unified_chat("s1", "confirm").await.unwrap_err();
        assert!(matches!(err, SessionError::MissingStyle));
        assert_eq!(text.call_count(), calls_before);
    }

    #[tokio::test]
    async fn test_refine_outline_revision_replaces_outline() {
        let (machine, text, _) = machine(vec![outline_reply(2), outline_reply(3)]);
        with_outline(&machine, "s1", 2).await;

        let outcome = machine
            .refine_outline("s1", "add a page about budget")
            .await
            .unwrap();
        match outcome {
            RefineOutline::Revised(result) => assert_eq!(result.outline.len(), 3),
            other => panic!("expected Revised, got {other:?}"),
        }
        assert_eq!(stage_of(&machine, "s1").await, SessionStage::OutlineRefine);
        assert!(text.last_prompt().contains("add a page about budget"));
    }

    #[tokio::test]
    async fn test_refine_outline_rejects_empty_feedback() {
        let (machine, text, _) = machine(vec![outline_reply(1)]);
        with_outline(&machine, "s1", 1).await;

        let err = machine.refine_outline("s1", "   ").await.unwrap_err();
        assert!(matches!(err, SessionError::EmptyFeedback));
        assert_eq!(text.call_count(), 1); // only the outline generation
    }

    #[tokio::test]
    async fn test_refine_outline_failure_keeps_user_message_logged() {
        let (machine, _, _) = machine(vec![
            outline_reply(1),
            TextOutcome::failed("failed after 3 attempts: connection refused"),
        ]);
        with_outline(&machine, "s1", 1).await;
        let messages_before = machine.sessions().get_or_create("s1").await.messages.len();

        let err = machine.refine_outline("s1", "tighten page 1").await.unwrap_err();
        assert!(matches!(err, SessionError::Generation { .. }));

        let session = machine.sessions().get_or_create("s1").await;
        assert_eq!(session.stage, SessionStage::OutlineRefine);
        // The triggering user message is logged even though state did not advance.
        assert_eq!(session.messages.len(), messages_before + 1);
        assert_eq!(session.messages.last().unwrap().role, MessageRole::User);
    }

    #[tokio::test]
    async fn test_update_outline_rerenders_text_deterministically() {
        let (machine, _, _) = machine(vec![]);
        let outline = vec![
            OutlinePage {
                page: 1,
                theme: "t".to_string(),
                title: "Edited Title".to_string(),
                content: "edited content".to_string(),
            },
        ];
        machine.update_outline("s1", outline).await;

        let session = machine.sessions().get_or_create("s1").await;
        assert_eq!(session.outline.len(), 1);
        assert!(session.outline_text.contains("[Page 1] Edited Title"));
        assert!(session.outline_text.contains("edited content"));
    }

    // -------------------------------------------------------------------
    // Style
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn test_generate_style_requires_outline() {
        let (machine, _, _) = machine(vec![style_reply(1)]);
        let err = machine.generate_style("s1").await.unwrap_err();
        assert!(matches!(err, SessionError::MissingOutline));
    }

    #[tokio::test]
    async fn test_generate_style_success_strips_prompts() {
        let (machine, _, _) = machine(vec![outline_reply(2), style_reply(2)]);
        with_outline(&machine, "s1", 2).await;

        let result = machine.generate_style("s1").await.unwrap();
        assert_eq!(result.style.len(), 2);
        // The structured summaries never expose the raw image prompts.
        let json = serde_json::to_string(&result.style).unwrap();
        assert!(!json.contains("render page"));

        let session = machine.sessions().get_or_create("s1").await;
        assert_eq!(session.stage, SessionStage::StyleRefine);
        assert_eq!(session.style.len(), 2);
        assert_eq!(session.style[0].prompt, "render page 1");
    }

    #[tokio::test]
    async fn test_generate_style_page_count_mismatch_rejected() {
        let (machine, _, _) = machine(vec![outline_reply(2), style_reply(3)]);
        with_outline(&machine, "s1", 2).await;

        let err = machine.generate_style("s1").await.unwrap_err();
        assert!(matches!(err, SessionError::Unparsable { .. }));
        assert_eq!(stage_of(&machine, "s1").await, SessionStage::OutlineRefine);
    }

    #[tokio::test]
    async fn test_refine_style_confirm_moves_to_generate() {
        let (machine, _, _) = machine(vec![outline_reply(1), style_reply(1)]);
        with_outline(&machine, "s1", 1).await;
        machine.generate_style("s1").await.unwrap();

        let outcome = machine.refine_style("s1", "generate").await.unwrap();
        assert!(matches!(outcome, RefineStyle::Confirmed));
        assert_eq!(stage_of(&machine, "s1").await, SessionStage::Generate);
    }

    // -------------------------------------------------------------------
    // Image generation
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn test_generate_image_validates_bounds_and_prompt() {
        let (machine, _, _) = machine(vec![outline_reply(1), style_reply(1)]);
        with_outline(&machine, "s1", 1).await;

        let err = machine.generate_image("s1", 0).await.unwrap_err();
        assert!(matches!(err, SessionError::MissingStyle));

        machine.generate_style("s1").await.unwrap();
        let err = machine.generate_image("s1", 5).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::PageOutOfRange { index: 5, pages: 1 }
        ));
    }

    #[tokio::test]
    async fn test_generate_image_success_records_entry() {
        let (machine, _, images) = machine(vec![outline_reply(1), style_reply(1)]);
        with_outline(&machine, "s1", 1).await;
        machine.generate_style("s1").await.unwrap();

        let result = machine.generate_image("s1", 0).await.unwrap();
        assert_eq!(result.filename, "s1_page_1.jpg");

        let session = machine.sessions().get_or_create("s1").await;
        let image = session.generated_image(0).unwrap();
        assert_eq!(image.page, 1);
        assert_eq!(images.requests().len(), 1);
        assert!(images.requests()[0].prompt.contains("render page 1"));
    }

    #[tokio::test]
    async fn test_generate_image_failure_surfaces_advisory() {
        let (machine, _, _) = machine_with(
            vec![outline_reply(1), style_reply(1)],
            ScriptedImages::failing(),
        );
        with_outline(&machine, "s1", 1).await;
        machine.generate_style("s1").await.unwrap();

        let err = machine.generate_image("s1", 0).await.unwrap_err();
        match err {
            SessionError::Generation { advisory, .. } => {
                assert!(advisory.unwrap().contains("3 attempts"));
            }
            other => panic!("expected Generation, got {other:?}"),
        }
        let session = machine.sessions().get_or_create("s1").await;
        assert!(session.generated_image(0).is_none());
    }

    #[tokio::test]
    async fn test_batch_generation_isolates_page_failures() {
        // Three pages; page 2's prompt is empty and must fail independently.
        let style = TextOutcome::ok(
            r#"```json
{"pages": [
  {"page": 1, "theme": "a", "design_concept": "c1", "prompt": "p1"},
  {"page": 2, "theme": "b", "design_concept": "c2", "prompt": ""},
  {"page": 3, "theme": "c", "design_concept": "c3", "prompt": "p3"}
]}
```"#,
        );
        let (machine, _, images) = machine(vec![outline_reply(3), style]);
        with_outline(&machine, "s1", 3).await;
        machine.generate_style("s1").await.unwrap();

        let report = machine.generate_all_images("s1").await.unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert!(report.results[0].success);
        assert!(!report.results[1].success);
        assert!(report.results[2].success);
        // No request was issued for the promptless page.
        assert_eq!(images.requests().len(), 2);

        let session = machine.sessions().get_or_create("s1").await;
        assert_eq!(session.stage, SessionStage::Complete);
        assert!(session.generated_image(0).is_some());
        assert!(session.generated_image(1).is_none());
        assert!(session.generated_image(2).is_some());
    }

    #[tokio::test]
    async fn test_batch_generation_requires_style() {
        let (machine, _, _) = machine(vec![]);
        let err = machine.generate_all_images("s1").await.unwrap_err();
        assert!(matches!(err, SessionError::MissingStyle));
    }

    // -------------------------------------------------------------------
    // Page refine side channel
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn test_refine_page_keeps_stage_and_uses_baseline() {
        let page_reply = TextOutcome::ok(
            r#"{"page": 1, "theme": "a", "design_concept": "bigger title", "prompt": "revised prompt"}"#,
        );
        let (machine, _, images) = machine(vec![
            outline_reply(1),
            style_reply(1),
            page_reply,
        ]);
        with_outline(&machine, "s1", 1).await;
        machine.generate_style("s1").await.unwrap();
        machine.generate_all_images("s1").await.unwrap();
        assert_eq!(stage_of(&machine, "s1").await, SessionStage::Complete);

        let result = machine
            .refine_page("s1", 0, "make the title larger")
            .await
            .unwrap();
        assert_eq!(result.updated_style.design_concept, "bigger title");

        // Stage is untouched by the side channel.
        assert_eq!(stage_of(&machine, "s1").await, SessionStage::Complete);

        let session = machine.sessions().get_or_create("s1").await;
        assert_eq!(session.style[0].prompt, "revised prompt");

        // The regeneration used the current image as a delta-edit baseline.
        let request = images.requests().last().unwrap().clone();
        assert_eq!(request.reference_kind, ReferenceKind::Refine);
        assert!(request.reference_image_path.is_some());
        assert!(request.prompt.contains("make the title larger"));
        assert!(request.prompt.contains("revised prompt"));
    }

    #[tokio::test]
    async fn test_refine_page_bounds_checked() {
        let (machine, _, _) = machine(vec![outline_reply(1), style_reply(1)]);
        with_outline(&machine, "s1", 1).await;
        machine.generate_style("s1").await.unwrap();

        let err = machine.refine_page("s1", 4, "feedback").await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::PageOutOfRange { index: 4, pages: 1 }
        ));
    }

    // -------------------------------------------------------------------
    // Unified chat
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn test_full_scenario_idea_to_complete() {
        let (machine, text, _) = machine(vec![outline_reply(1), style_reply(1)]);

        machine.submit_idea("S1", "quarterly strategy review").await;
        assert_eq!(stage_of(&machine, "S1").await, SessionStage::Outline);

        let result = machine
            .generate_outline(
                "S1",
                GenerateOutlineRequest {
                    idea: "quarterly strategy review".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(result.outline.len(), 1);
        assert_eq!(stage_of(&machine, "S1").await, SessionStage::OutlineRefine);

        // Confirming makes no provider call for this step.
        let calls_before = text.call_count();
        let outcome = machine.refine_outline("S1", "confirm").await.unwrap();
        assert!(matches!(outcome, RefineOutline::Confirmed));
        assert_eq!(text.call_count(), calls_before);
        assert_eq!(stage_of(&machine, "S1").await, SessionStage::Style);

        let style = machine.generate_style("S1").await.unwrap();
        assert_eq!(style.style.len(), 1);
        assert_eq!(stage_of(&machine, "S1").await, SessionStage::StyleRefine);

        let reply = machine.unified_chat("S1", "generate").await.unwrap();
        match reply {
            ChatReply::Generated(report) => {
                assert_eq!(report.total, 1);
                assert_eq!(report.succeeded, 1);
            }
            other => panic!("expected Generated, got {other:?}"),
        }
        let session = machine.sessions().get_or_create("S1").await;
        assert_eq!(session.stage, SessionStage::Complete);
        assert!(session.generated_image(0).is_some());
    }

    #[tokio::test]
    async fn test_unified_chat_in_input_generates_outline() {
        let (machine, _, _) = machine(vec![outline_reply(2)]);
        let reply = machine.unified_chat("s1", "a deck about hiring").await.unwrap();
        match reply {
            ChatReply::Outline(result) => assert_eq!(result.outline.len(), 2),
            other => panic!("expected Outline, got {other:?}"),
        }
        assert_eq!(stage_of(&machine, "s1").await, SessionStage::OutlineRefine);
    }

    #[tokio::test]
    async fn test_unified_chat_complete_modify_page() {
        let (machine, _, _) = machine(vec![outline_reply(1), style_reply(1)]);
        with_outline(&machine, "s1", 1).await;
        machine.generate_style("s1").await.unwrap();
        machine.generate_all_images("s1").await.unwrap();

        let reply = machine.unified_chat("s1", "modify page 1").await.unwrap();
        match reply {
            ChatReply::EditingPage { page, .. } => assert_eq!(page, 1),
            other => panic!("expected EditingPage, got {other:?}"),
        }
        assert_eq!(stage_of(&machine, "s1").await, SessionStage::Complete);

        let reply = machine.unified_chat("s1", "thanks!").await.unwrap();
        assert!(matches!(reply, ChatReply::Complete { .. }));
        assert_eq!(stage_of(&machine, "s1").await, SessionStage::Complete);
    }

    #[tokio::test]
    async fn test_unified_chat_during_generation_acknowledges() {
        let (machine, text, _) = machine(vec![outline_reply(1), style_reply(1)]);
        with_outline(&machine, "s1", 1).await;
        machine.generate_style("s1").await.unwrap();
        machine.confirm_style("s1").await;
        assert_eq!(stage_of(&machine, "s1").await, SessionStage::Generate);

        let calls_before = text.call_count();
        let reply = machine.unified_chat("s1", "how is it going?").await.unwrap();
        assert!(matches!(reply, ChatReply::Generating { .. }));
        assert_eq!(text.call_count(), calls_before);
    }

    #[test]
    fn test_extract_modify_page_variants() {
        assert_eq!(extract_modify_page("modify page 3"), Some(3));
        assert_eq!(extract_modify_page("please Modify Page 12 for me"), Some(12));
        assert_eq!(extract_modify_page("modify page3"), Some(3));
        assert_eq!(extract_modify_page("change slide 3"), None);
        assert_eq!(extract_modify_page("modify page"), None);
    }

    // -------------------------------------------------------------------
    // Side inputs
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn test_attach_material_out_of_range_always_rejected() {
        let (machine, _, _) = machine(vec![outline_reply(2)]);
        let material = PageMaterial {
            filename: "chart.png".to_string(),
            path: Some(PathBuf::from("/m/chart.png")),
            kind: MaterialKind::Image,
            description: String::new(),
            table_text: None,
        };

        // Before any outline exists, every index is out of range.
        let err = machine
            .attach_page_material("s1", 0, material.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::PageOutOfRange { pages: 0, .. }));

        with_outline(&machine, "s1", 2).await;

        // Index == outline length is out of range regardless of history.
        let err = machine
            .attach_page_material("s1", 2, material.clone())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::PageOutOfRange { index: 2, pages: 2 }
        ));

        let count = machine.attach_page_material("s1", 1, material).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(machine.page_materials("s1", 1).await.len(), 1);
    }

    #[tokio::test]
    async fn test_attach_table_text_requires_content() {
        let (machine, _, _) = machine(vec![outline_reply(1)]);
        with_outline(&machine, "s1", 1).await;

        let material = PageMaterial {
            filename: "pasted table".to_string(),
            path: None,
            kind: MaterialKind::TableText,
            description: String::new(),
            table_text: Some("   ".to_string()),
        };
        let err = machine
            .attach_page_material("s1", 0, material)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::EmptyTableText));
    }

    #[tokio::test]
    async fn test_remove_material_deletes_backing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let file_path = dir.path().join("chart.png");
        tokio::fs::write(&file_path, b"png bytes").await.unwrap();

        let (machine, _, _) = machine(vec![outline_reply(1)]);
        with_outline(&machine, "s1", 1).await;
        machine
            .attach_page_material(
                "s1",
                0,
                PageMaterial {
                    filename: "chart.png".to_string(),
                    path: Some(file_path.clone()),
                    kind: MaterialKind::Image,
                    description: String::new(),
                    table_text: None,
                },
            )
            .await
            .unwrap();

        let err = machine.remove_page_material("s1", 0, 3).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::MaterialOutOfRange { index: 3, count: 1 }
        ));

        let removed = machine.remove_page_material("s1", 0, 0).await.unwrap();
        assert_eq!(removed.filename, "chart.png");
        assert!(!file_path.exists());
        assert!(machine.page_materials("s1", 0).await.is_empty());
    }

    #[tokio::test]
    async fn test_attach_transcript_rejects_empty() {
        let (machine, _, _) = machine(vec![]);
        let err = machine.attach_audio_transcript("s1", "  ").await.unwrap_err();
        assert!(matches!(err, SessionError::EmptyTranscript));
    }

    #[tokio::test]
    async fn test_support_document_truncation_and_accumulation() {
        let (machine, _, _) = machine(vec![]);
        let long = "x".repeat(12_000);
        machine
            .attach_support_document("s1", "big.pdf", None, &long)
            .await
            .unwrap();
        machine
            .attach_support_document("s1", "small.txt", None, "short text")
            .await
            .unwrap();

        let session = machine.sessions().get_or_create("s1").await;
        assert!(session.support_docs_text.contains("--- big.pdf ---"));
        assert!(session.support_docs_text.contains("...(document truncated)"));
        assert!(session.support_docs_text.contains("--- small.txt ---"));
        assert_eq!(session.support_docs_files.len(), 2);

        machine.clear_support_documents("s1").await;
        let session = machine.sessions().get_or_create("s1").await;
        assert!(session.support_docs_text.is_empty());
        assert!(session.support_docs_files.is_empty());
    }

    #[tokio::test]
    async fn test_attach_support_document_rejects_empty_extract() {
        let (machine, _, _) = machine(vec![]);
        let err = machine
            .attach_support_document("s1", "scan.pdf", None, "")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::EmptyDocumentText));
    }

    // -------------------------------------------------------------------
    // Reference / template / logo
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn test_set_reference_image_plain_skips_analysis() {
        let (machine, _, _) = machine(vec![]);
        let analysis = machine
            .set_reference_image("s1", Path::new("/ref/style.png"), ReferenceKind::Reference)
            .await;
        assert!(analysis.is_none());

        let session = machine.sessions().get_or_create("s1").await;
        assert_eq!(session.reference_kind, ReferenceKind::Reference);
        assert!(session.template_analysis.is_none());
    }

    #[tokio::test]
    async fn test_set_reference_template_stores_analysis() {
        let mut fixed = TemplateAnalysis::default();
        fixed.style_summary = Some("flat corporate".to_string());
        let machine = DeckMachine::new(
            TestSessions::default(),
            ScriptedText::default(),
            ScriptedImages::default(),
            FixedAnalyzer(fixed),
            PathBuf::from("out"),
        );

        let analysis = machine
            .set_reference_image("s1", Path::new("/ref/master.png"), ReferenceKind::Template)
            .await;
        assert_eq!(analysis.unwrap().style_summary.as_deref(), Some("flat corporate"));

        let session = machine.sessions().get_or_create("s1").await;
        assert_eq!(session.reference_kind, ReferenceKind::Template);
        assert!(session.template_analysis.is_some());
    }

    #[tokio::test]
    async fn test_set_logo_recorded_and_used_in_prompt() {
        let (machine, _, images) = machine(vec![outline_reply(1), style_reply(1)]);
        machine.set_logo("s1", Path::new("/ref/logo.png")).await;
        with_outline(&machine, "s1", 1).await;
        machine.generate_style("s1").await.unwrap();
        machine.generate_image("s1", 0).await.unwrap();

        let request = images.requests().last().unwrap().clone();
        assert_eq!(
            request.custom_logo_path.as_deref(),
            Some(Path::new("/ref/logo.png"))
        );
        assert!(request.prompt.contains("top-right corner"));
    }

    #[tokio::test]
    async fn test_session_view_reflects_state() {
        let (machine, _, _) = machine(vec![outline_reply(1), style_reply(1)]);
        with_outline(&machine, "s1", 1).await;
        machine.generate_style("s1").await.unwrap();

        let view = machine.session_view("s1").await;
        assert_eq!(view.session_id, "s1");
        assert_eq!(view.stage, SessionStage::StyleRefine);
        assert_eq!(view.outline.len(), 1);
        assert_eq!(view.style.len(), 1);
        assert!(!view.messages.is_empty());
    }
}
