//! Page image generation handlers.
//!
//! Endpoints:
//! - POST /api/image/generate     - generate one page's image
//! - POST /api/image/generate-all - generate every page sequentially
//! - POST /api/page/refine        - refine one page's design and regenerate

use axum::Json;
use axum::extract::State;
use serde::Deserialize;

use slidesmith_core::machine::output::{
    BatchImageReport, GenerateImageResult, PageRefineResult,
};

use crate::http::error::AppError;
use crate::http::handlers::outline::SessionBody;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateImageBody {
    pub session_id: String,
    pub page_index: usize,
}

/// POST /api/image/generate
pub async fn generate_image(
    State(state): State<AppState>,
    Json(body): Json<GenerateImageBody>,
) -> Result<Json<GenerateImageResult>, AppError> {
    let result = state
        .machine
        .generate_image(&body.session_id, body.page_index)
        .await?;
    Ok(Json(result))
}

/// POST /api/image/generate-all
pub async fn generate_all_images(
    State(state): State<AppState>,
    Json(body): Json<SessionBody>,
) -> Result<Json<BatchImageReport>, AppError> {
    let report = state.machine.generate_all_images(&body.session_id).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct RefinePageBody {
    pub session_id: String,
    pub page_index: usize,
    pub feedback: String,
}

/// POST /api/page/refine
pub async fn refine_page(
    State(state): State<AppState>,
    Json(body): Json<RefinePageBody>,
) -> Result<Json<PageRefineResult>, AppError> {
    let result = state
        .machine
        .refine_page(&body.session_id, body.page_index, &body.feedback)
        .await?;
    Ok(Json(result))
}
