//! Design plan handlers.
//!
//! Endpoints:
//! - POST /api/style/generate - generate the design plan from the outline
//! - POST /api/style/refine   - apply feedback or confirm
//! - POST /api/style/confirm  - explicit confirmation

use axum::Json;
use axum::extract::State;

use slidesmith_core::machine::output::{RefineStyle, StyleResult};

use crate::http::error::AppError;
use crate::http::handlers::outline::{Ack, RefineBody, SessionBody};
use crate::state::AppState;

/// POST /api/style/generate
pub async fn generate_style(
    State(state): State<AppState>,
    Json(body): Json<SessionBody>,
) -> Result<Json<StyleResult>, AppError> {
    let result = state.machine.generate_style(&body.session_id).await?;
    Ok(Json(result))
}

/// POST /api/style/refine
pub async fn refine_style(
    State(state): State<AppState>,
    Json(body): Json<RefineBody>,
) -> Result<Json<RefineStyle>, AppError> {
    let outcome = state
        .machine
        .refine_style(&body.session_id, &body.feedback)
        .await?;
    Ok(Json(outcome))
}

/// POST /api/style/confirm
pub async fn confirm_style(
    State(state): State<AppState>,
    Json(body): Json<SessionBody>,
) -> Json<Ack> {
    state.machine.confirm_style(&body.session_id).await;
    Json(Ack {
        success: true,
        message: "Design plan confirmed, ready to generate page images.".to_string(),
    })
}
