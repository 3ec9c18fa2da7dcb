//! Reference image and logo handlers.
//!
//! Endpoints:
//! - POST /api/reference - set the reference/template image for a session
//! - POST /api/logo      - set the custom logo
//!
//! Paths point at files the upload collaborator has already written;
//! uploading a template triggers the one-shot design analysis.

use std::path::PathBuf;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use slidesmith_types::session::{ReferenceKind, TemplateAnalysis};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SetReferenceBody {
    pub session_id: String,
    pub path: PathBuf,
    #[serde(default)]
    pub kind: ReferenceKind,
}

#[derive(Debug, Serialize)]
pub struct SetReferenceResponse {
    pub success: bool,
    pub kind: ReferenceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_analysis: Option<TemplateAnalysis>,
}

/// POST /api/reference
pub async fn set_reference(
    State(state): State<AppState>,
    Json(body): Json<SetReferenceBody>,
) -> Json<SetReferenceResponse> {
    let analysis = state
        .machine
        .set_reference_image(&body.session_id, &body.path, body.kind)
        .await;
    Json(SetReferenceResponse {
        success: true,
        kind: body.kind,
        template_analysis: analysis,
    })
}

#[derive(Debug, Deserialize)]
pub struct SetLogoBody {
    pub session_id: String,
    pub path: PathBuf,
}

/// POST /api/logo
pub async fn set_logo(
    State(state): State<AppState>,
    Json(body): Json<SetLogoBody>,
) -> Json<serde_json::Value> {
    state.machine.set_logo(&body.session_id, &body.path).await;
    Json(serde_json::json!({ "success": true }))
}
