//! Application error type mapping session errors to HTTP responses.
//!
//! Validation failures map to 400, missing prerequisites to 400, and
//! provider-side failures to 502 with the advisory (and raw response text,
//! where preserved) included so clients can display it for diagnosis.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use slidesmith_types::error::SessionError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Session(SessionError),
    Internal(String),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        AppError::Session(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, detail) = match &self {
            AppError::Session(err @ SessionError::PageOutOfRange { .. }) => {
                (StatusCode::BAD_REQUEST, "PAGE_OUT_OF_RANGE", err.to_string(), None)
            }
            AppError::Session(err @ SessionError::MaterialOutOfRange { .. }) => {
                (StatusCode::BAD_REQUEST, "MATERIAL_OUT_OF_RANGE", err.to_string(), None)
            }
            AppError::Session(
                err @ (SessionError::EmptyFeedback
                | SessionError::EmptyTableText
                | SessionError::EmptyDocumentText
                | SessionError::EmptyTranscript),
            ) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string(), None),
            AppError::Session(err @ (SessionError::MissingOutline | SessionError::MissingStyle)) => {
                (StatusCode::BAD_REQUEST, "MISSING_PREREQUISITE", err.to_string(), None)
            }
            AppError::Session(err @ SessionError::MissingPrompt { .. }) => {
                (StatusCode::BAD_REQUEST, "MISSING_PROMPT", err.to_string(), None)
            }
            AppError::Session(SessionError::Generation { message, advisory }) => (
                StatusCode::BAD_GATEWAY,
                "GENERATION_FAILED",
                message.clone(),
                advisory.as_ref().map(|a| json!({ "retry_info": a })),
            ),
            AppError::Session(SessionError::Unparsable { message, raw }) => (
                StatusCode::BAD_GATEWAY,
                "UNPARSEABLE_RESPONSE",
                message.clone(),
                Some(json!({ "raw_response": raw })),
            ),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone(), None)
            }
        };

        let mut body = json!({
            "code": code,
            "message": message,
        });
        if let Some(detail) = detail {
            body["detail"] = detail;
        }

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
