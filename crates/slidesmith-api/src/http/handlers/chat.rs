//! Unified conversational entry point.
//!
//! Endpoint:
//! - POST /api/chat - dispatches on the session's current stage

use axum::Json;
use axum::extract::State;
use serde::Deserialize;

use slidesmith_core::machine::output::ChatReply;

use crate::http::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub session_id: String,
    pub content: String,
}

/// POST /api/chat
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatReply>, AppError> {
    let reply = state
        .machine
        .unified_chat(&body.session_id, &body.content)
        .await?;
    Ok(Json(reply))
}
