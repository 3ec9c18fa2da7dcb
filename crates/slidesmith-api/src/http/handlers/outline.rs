//! Idea intake and outline handlers.
//!
//! Endpoints:
//! - POST /api/input            - submit the user's idea
//! - POST /api/outline/generate - generate the outline
//! - POST /api/outline/refine   - apply feedback or confirm
//! - POST /api/outline/confirm  - explicit confirmation
//! - POST /api/outline/update   - sync an externally edited outline

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use slidesmith_core::machine::output::{GenerateOutlineRequest, OutlineResult, RefineOutline};
use slidesmith_types::session::OutlinePage;
use slidesmith_types::settings::TemplateSettings;

use crate::http::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitIdeaBody {
    pub session_id: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

/// POST /api/input
pub async fn submit_idea(
    State(state): State<AppState>,
    Json(body): Json<SubmitIdeaBody>,
) -> Json<Ack> {
    state.machine.submit_idea(&body.session_id, &body.content).await;
    Json(Ack {
        success: true,
        message: "Idea received, ready to generate the outline.".to_string(),
    })
}

#[derive(Debug, Deserialize)]
pub struct GenerateOutlineBody {
    pub session_id: String,
    pub content: String,
    #[serde(default)]
    pub page_count: Option<u32>,
    #[serde(default)]
    pub page_instructions: Option<String>,
    #[serde(default)]
    pub design_principles: Option<String>,
    #[serde(default)]
    pub template_settings: Option<TemplateSettings>,
}

/// POST /api/outline/generate
pub async fn generate_outline(
    State(state): State<AppState>,
    Json(body): Json<GenerateOutlineBody>,
) -> Result<Json<OutlineResult>, AppError> {
    let result = state
        .machine
        .generate_outline(
            &body.session_id,
            GenerateOutlineRequest {
                idea: body.content,
                page_count: body.page_count,
                page_instructions: body.page_instructions,
                design_principles: body.design_principles,
                template_settings: body.template_settings,
            },
        )
        .await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct RefineBody {
    pub session_id: String,
    pub feedback: String,
}

/// POST /api/outline/refine
pub async fn refine_outline(
    State(state): State<AppState>,
    Json(body): Json<RefineBody>,
) -> Result<Json<RefineOutline>, AppError> {
    let outcome = state
        .machine
        .refine_outline(&body.session_id, &body.feedback)
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct SessionBody {
    pub session_id: String,
}

/// POST /api/outline/confirm
pub async fn confirm_outline(
    State(state): State<AppState>,
    Json(body): Json<SessionBody>,
) -> Json<Ack> {
    state.machine.confirm_outline(&body.session_id).await;
    Json(Ack {
        success: true,
        message: "Outline confirmed, ready to generate the design plan.".to_string(),
    })
}

#[derive(Debug, Deserialize)]
pub struct UpdateOutlineBody {
    pub session_id: String,
    pub outline: Vec<OutlinePage>,
}

/// POST /api/outline/update
pub async fn update_outline(
    State(state): State<AppState>,
    Json(body): Json<UpdateOutlineBody>,
) -> Json<Ack> {
    let pages = body.outline.len();
    state.machine.update_outline(&body.session_id, body.outline).await;
    Json(Ack {
        success: true,
        message: format!("Outline updated ({pages} pages)."),
    })
}
