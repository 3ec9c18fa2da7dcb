//! Gemini generation client.
//!
//! One logical generation request = up to `max_attempts` HTTP attempts with
//! a fixed inter-attempt delay. Each attempt's outcome is classified
//! (expected shape, unexpected shape, timeout, connection failure, non-200
//! status, other) and only success-with-expected-shape returns early; the
//! last classification becomes the terminal advisory when attempts run out.
//! Provider failures are always converted to data -- the state machine never
//! sees an error from this client.

pub mod analyze;
pub mod image;
pub mod text;
pub mod types;

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::warn;

use crate::config::ServiceConfig;

use types::InlineBlob;

/// Classification of a single failed attempt.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed")]
    Connection,

    #[error("provider returned HTTP {0}")]
    Status(u16),

    #[error("response carried no text part")]
    MissingText,

    #[error("response carried no image part")]
    MissingImage,

    #[error("{0}")]
    Other(String),
}

impl AttemptError {
    /// Map a reqwest transport error onto the attempt taxonomy.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AttemptError::Timeout
        } else if err.is_connect() {
            AttemptError::Connection
        } else {
            AttemptError::Other(err.to_string())
        }
    }
}

/// Client for the Gemini `generateContent` endpoint family.
///
/// The API key is wrapped in [`SecretString`] and only exposed when building
/// request headers; the struct deliberately does not derive `Debug`.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    text_model: String,
    image_model: String,
    max_attempts: u32,
    retry_delay: Duration,
    text_timeout: Duration,
    image_timeout: Duration,
    analyze_timeout: Duration,
}

impl GeminiClient {
    pub fn new(config: &ServiceConfig, api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url: config.api_base.clone(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_secs(config.retry_delay_secs),
            text_timeout: Duration::from_secs(config.text_timeout_secs),
            image_timeout: Duration::from_secs(config.image_timeout_secs),
            analyze_timeout: Duration::from_secs(config.analyze_timeout_secs),
        }
    }

    /// Override the base URL (useful for tests and proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Full URL of a model's generateContent endpoint.
    fn url(&self, model: &str) -> String {
        format!("{}/{}:generateContent", self.base_url, model)
    }

    /// Issue one POST with the shared auth headers and a per-call timeout.
    async fn post_once(
        &self,
        model: &str,
        body: &types::GenerateContentRequest,
        timeout: Duration,
    ) -> Result<types::GenerateContentResponse, AttemptError> {
        let response = self
            .client
            .post(self.url(model))
            .header("content-type", "application/json")
            .header("x-goog-api-key", self.api_key.expose_secret())
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(AttemptError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status.as_u16()));
        }

        response
            .json()
            .await
            .map_err(|err| AttemptError::Other(format!("malformed response body: {err}")))
    }

    /// Read a file and wrap it as an inline attachment, or skip it.
    async fn load_attachment(path: &Path) -> Option<InlineBlob> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Some(InlineBlob {
                mime_type: mime_type_for(path).to_string(),
                data: BASE64.encode(bytes),
            }),
            Err(err) => {
                warn!(path = %path.display(), %err, "skipping unreadable attachment");
                None
            }
        }
    }
}

/// MIME type inferred from a file extension; unknown extensions fall back
/// to PNG, matching what the upload collaborators accept.
pub fn mime_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

/// Advisory attached to a success that needed more than one attempt.
fn retried_advisory(attempt: u32) -> String {
    format!("provider was unstable, succeeded on attempt {attempt}")
}

/// Advisory attached to a terminal failure.
fn terminal_advisory(max_attempts: u32, last_error: &AttemptError) -> String {
    format!("generation failed after {max_attempts} attempts: {last_error}")
}

/// Run an attempt closure under the bounded-retry policy.
///
/// Returns `Ok((value, advisory))` on success -- advisory is `None` on
/// first-attempt success -- or `Err(terminal_advisory)` once attempts are
/// exhausted. The delay is slept between attempts, never after the last.
pub(crate) async fn with_retries<T, F, Fut>(
    max_attempts: u32,
    delay: Duration,
    mut attempt_fn: F,
) -> Result<(T, Option<String>), String>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut last_error = AttemptError::Other("no attempt made".to_string());

    for attempt in 1..=max_attempts {
        match attempt_fn(attempt).await {
            Ok(value) => {
                let advisory = (attempt > 1).then(|| retried_advisory(attempt));
                return Ok((value, advisory));
            }
            Err(err) => {
                warn!(attempt, max_attempts, %err, "generation attempt failed");
                last_error = err;
            }
        }
        if attempt < max_attempts {
            tokio::time::sleep(delay).await;
        }
    }

    Err(terminal_advisory(max_attempts, &last_error))
}
