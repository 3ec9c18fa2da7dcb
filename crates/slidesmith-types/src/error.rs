use thiserror::Error;

/// Errors surfaced by session operations.
///
/// Validation variants are rejected before any provider call is made.
/// `Generation` and `Unparsable` carry the provider advisory (and raw
/// response text where available) so callers can display it for diagnosis;
/// the triggering user message stays logged and the stage is unchanged.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("page index {index} out of range, outline has {pages} pages")]
    PageOutOfRange { index: usize, pages: usize },

    #[error("feedback must not be empty")]
    EmptyFeedback,

    #[error("table text must not be empty")]
    EmptyTableText,

    #[error("extracted document text must not be empty")]
    EmptyDocumentText,

    #[error("transcript must not be empty")]
    EmptyTranscript,

    #[error("no outline has been generated yet")]
    MissingOutline,

    #[error("no style plan has been generated yet")]
    MissingStyle,

    #[error("page {page} has no generation prompt")]
    MissingPrompt { page: u32 },

    #[error("material index {index} out of range, page has {count} materials")]
    MaterialOutOfRange { index: usize, count: usize },

    #[error("{message}")]
    Generation {
        message: String,
        advisory: Option<String>,
    },

    #[error("{message}")]
    Unparsable { message: String, raw: String },
}

impl SessionError {
    /// Generation failure carrying the provider advisory.
    pub fn generation(message: impl Into<String>, advisory: Option<String>) -> Self {
        SessionError::Generation {
            message: message.into(),
            advisory,
        }
    }

    /// Parse failure preserving the raw response text.
    pub fn unparsable(message: impl Into<String>, raw: impl Into<String>) -> Self {
        SessionError::Unparsable {
            message: message.into(),
            raw: raw.into(),
        }
    }
}
