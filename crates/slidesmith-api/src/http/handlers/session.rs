//! Health, defaults, and session snapshot handlers.
//!
//! Endpoints:
//! - GET /api/health        - liveness and version
//! - GET /api/defaults      - built-in generation defaults
//! - GET /api/session/{id}  - session snapshot for client replay

use axum::Json;
use axum::extract::{Path, State};

use slidesmith_core::machine::output::SessionView;
use slidesmith_core::prompt::DEFAULT_DESIGN_PRINCIPLES;
use slidesmith_core::session::SessionRepository;

use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sessions = state.machine.sessions().len().await;
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": sessions,
    }))
}

/// GET /api/defaults
pub async fn defaults() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "design_principles": DEFAULT_DESIGN_PRINCIPLES,
    }))
}

/// GET /api/session/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<SessionView> {
    Json(state.machine.session_view(&session_id).await)
}
