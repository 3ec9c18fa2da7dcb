//! Text generation with bounded retries.

use tracing::debug;

use slidesmith_core::generate::TextGenerator;
use slidesmith_types::outcome::TextOutcome;

use super::types::GenerateContentRequest;
use super::{AttemptError, GeminiClient, with_retries};

impl GeminiClient {
    /// One text-generation attempt: POST, check status, extract the text
    /// part. A 200 whose envelope carries no text is an unexpected-shape
    /// failure, not a success.
    async fn text_attempt(&self, prompt: &str) -> Result<String, AttemptError> {
        let request = GenerateContentRequest::text(&self.text_model, prompt);
        let response = self
            .post_once(&self.text_model, &request, self.text_timeout)
            .await?;
        response
            .first_text()
            .map(str::to_string)
            .ok_or(AttemptError::MissingText)
    }
}

impl TextGenerator for GeminiClient {
    async fn generate_text(&self, prompt: &str) -> TextOutcome {
        debug!(chars = prompt.len(), "text generation requested");
        match with_retries(self.max_attempts, self.retry_delay, |_| {
            self.text_attempt(prompt)
        })
        .await
        {
            Ok((text, Some(advisory))) => TextOutcome::ok_after_retries(text, advisory),
            Ok((text, None)) => TextOutcome::ok(text),
            Err(advisory) => TextOutcome::failed(advisory),
        }
    }
}
