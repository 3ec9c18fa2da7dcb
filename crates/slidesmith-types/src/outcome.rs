//! Generation outcome types.
//!
//! Every provider call resolves to a payload plus an optional advisory
//! message: `None` on first-attempt success, a "succeeded after N attempts"
//! notice on delayed success, or a terminal failure notice once attempts are
//! exhausted. Provider failures never escape as errors; the state machine
//! inspects the payload to decide whether a transition happened.

use serde::{Deserialize, Serialize};

/// Outcome of a text generation call.
///
/// An empty `text` means the attempt sequence was exhausted; `advisory` then
/// carries the terminal failure notice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextOutcome {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

impl TextOutcome {
    /// First-attempt success with no advisory.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            advisory: None,
        }
    }

    /// Success that required retries.
    pub fn ok_after_retries(text: impl Into<String>, advisory: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            advisory: Some(advisory.into()),
        }
    }

    /// Terminal failure: empty payload, mandatory advisory.
    pub fn failed(advisory: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            advisory: Some(advisory.into()),
        }
    }

    /// Whether the attempt sequence produced any text at all.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Outcome of an image generation call.
///
/// The payload is a success flag; the image itself is written to the
/// requested output path by the generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageOutcome {
    pub saved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

impl ImageOutcome {
    pub fn ok() -> Self {
        Self {
            saved: true,
            advisory: None,
        }
    }

    pub fn ok_after_retries(advisory: impl Into<String>) -> Self {
        Self {
            saved: true,
            advisory: Some(advisory.into()),
        }
    }

    pub fn failed(advisory: impl Into<String>) -> Self {
        Self {
            saved: false,
            advisory: Some(advisory.into()),
        }
    }
}
