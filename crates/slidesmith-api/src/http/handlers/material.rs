//! Side-input ingestion handlers: transcripts, documents, page materials.
//!
//! Upload handling and text extraction live outside this service; these
//! endpoints take already-extracted text and server-local paths.
//!
//! Endpoints:
//! - POST   /api/transcript                     - attach transcript text
//! - GET    /api/transcript/{session_id}        - read back the transcript
//! - POST   /api/support-doc                    - ingest an extracted document
//! - GET    /api/support-doc/{session_id}       - list ingested documents
//! - DELETE /api/support-doc/{session_id}       - clear ingested documents
//! - POST   /api/page-material                  - attach a material to a page
//! - DELETE /api/page-material                  - remove one material
//! - GET    /api/page-material/{session_id}     - all materials by page
//! - GET    /api/page-material/{session_id}/{page_index} - one page's materials

use std::collections::HashMap;
use std::path::PathBuf;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use slidesmith_core::session::SessionRepository;
use slidesmith_types::session::{MaterialKind, PageMaterial, SupportDocument};

use crate::http::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AttachTranscriptBody {
    pub session_id: String,
    pub transcript: String,
}

/// POST /api/transcript
pub async fn attach_transcript(
    State(state): State<AppState>,
    Json(body): Json<AttachTranscriptBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .machine
        .attach_audio_transcript(&body.session_id, &body.transcript)
        .await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// GET /api/transcript/{session_id}
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<serde_json::Value> {
    let session = state.machine.sessions().get_or_create(&session_id).await;
    Json(serde_json::json!({ "transcript": session.audio_transcript }))
}

#[derive(Debug, Deserialize)]
pub struct AttachDocumentBody {
    pub session_id: String,
    pub filename: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct AttachDocumentResponse {
    pub filename: String,
    pub text_length: usize,
}

/// POST /api/support-doc
pub async fn attach_support_document(
    State(state): State<AppState>,
    Json(body): Json<AttachDocumentBody>,
) -> Result<Json<AttachDocumentResponse>, AppError> {
    let text_length = state
        .machine
        .attach_support_document(&body.session_id, &body.filename, body.path, &body.text)
        .await?;
    Ok(Json(AttachDocumentResponse {
        filename: body.filename,
        text_length,
    }))
}

#[derive(Debug, Serialize)]
pub struct SupportDocumentList {
    pub files: Vec<SupportDocument>,
    pub total_text_length: usize,
}

/// GET /api/support-doc/{session_id}
pub async fn list_support_documents(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<SupportDocumentList> {
    let session = state.machine.sessions().get_or_create(&session_id).await;
    Json(SupportDocumentList {
        total_text_length: session.support_docs_text.chars().count(),
        files: session.support_docs_files,
    })
}

/// DELETE /api/support-doc/{session_id}
pub async fn clear_support_documents(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<serde_json::Value> {
    state.machine.clear_support_documents(&session_id).await;
    Json(serde_json::json!({ "success": true }))
}

#[derive(Debug, Deserialize)]
pub struct AttachMaterialBody {
    pub session_id: String,
    pub page_index: usize,
    pub filename: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
    pub kind: MaterialKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub table_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AttachMaterialResponse {
    pub page_index: usize,
    pub filename: String,
    pub kind: MaterialKind,
    pub total_materials: usize,
}

/// POST /api/page-material
pub async fn attach_page_material(
    State(state): State<AppState>,
    Json(body): Json<AttachMaterialBody>,
) -> Result<Json<AttachMaterialResponse>, AppError> {
    let material = PageMaterial {
        filename: body.filename.clone(),
        path: body.path,
        kind: body.kind,
        description: body.description.trim().to_string(),
        table_text: body.table_text,
    };
    let total = state
        .machine
        .attach_page_material(&body.session_id, body.page_index, material)
        .await?;
    Ok(Json(AttachMaterialResponse {
        page_index: body.page_index,
        filename: body.filename,
        kind: body.kind,
        total_materials: total,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RemoveMaterialQuery {
    pub session_id: String,
    pub page_index: usize,
    pub material_index: usize,
}

/// DELETE /api/page-material
pub async fn remove_page_material(
    State(state): State<AppState>,
    Query(query): Query<RemoveMaterialQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let removed = state
        .machine
        .remove_page_material(&query.session_id, query.page_index, query.material_index)
        .await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "removed": removed.filename,
    })))
}

/// GET /api/page-material/{session_id}
pub async fn list_all_materials(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<HashMap<String, Vec<PageMaterial>>> {
    let session = state.machine.sessions().get_or_create(&session_id).await;
    Json(session.page_materials)
}

/// GET /api/page-material/{session_id}/{page_index}
pub async fn list_page_materials(
    State(state): State<AppState>,
    Path((session_id, page_index)): Path<(String, usize)>,
) -> Json<Vec<PageMaterial>> {
    Json(state.machine.page_materials(&session_id, page_index).await)
}
