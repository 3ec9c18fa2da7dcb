//! Axum router configuration with middleware.
//!
//! All API routes live under `/api/`. Middleware: CORS, tracing. Generated
//! page images are served statically from the output directory under
//! `/images/`.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let images_dir = state.output_dir.clone();

    let api_routes = Router::new()
        .route("/health", get(handlers::session::health))
        .route("/defaults", get(handlers::session::defaults))
        .route("/session/{id}", get(handlers::session::get_session))
        // Conversation
        .route("/input", post(handlers::outline::submit_idea))
        .route("/chat", post(handlers::chat::chat))
        // Outline
        .route("/outline/generate", post(handlers::outline::generate_outline))
        .route("/outline/refine", post(handlers::outline::refine_outline))
        .route("/outline/confirm", post(handlers::outline::confirm_outline))
        .route("/outline/update", post(handlers::outline::update_outline))
        // Style
        .route("/style/generate", post(handlers::style::generate_style))
        .route("/style/refine", post(handlers::style::refine_style))
        .route("/style/confirm", post(handlers::style::confirm_style))
        // Images
        .route("/image/generate", post(handlers::image::generate_image))
        .route(
            "/image/generate-all",
            post(handlers::image::generate_all_images),
        )
        .route("/page/refine", post(handlers::image::refine_page))
        // Side inputs
        .route("/transcript", post(handlers::material::attach_transcript))
        .route(
            "/transcript/{session_id}",
            get(handlers::material::get_transcript),
        )
        .route(
            "/support-doc",
            post(handlers::material::attach_support_document),
        )
        .route(
            "/support-doc/{session_id}",
            get(handlers::material::list_support_documents)
                .delete(handlers::material::clear_support_documents),
        )
        .route(
            "/page-material",
            post(handlers::material::attach_page_material)
                .delete(handlers::material::remove_page_material),
        )
        .route(
            "/page-material/{session_id}",
            get(handlers::material::list_all_materials),
        )
        .route(
            "/page-material/{session_id}/{page_index}",
            get(handlers::material::list_page_materials),
        )
        // Reference / logo
        .route("/reference", post(handlers::reference::set_reference))
        .route("/logo", post(handlers::reference::set_logo));

    Router::new()
        .nest("/api", api_routes)
        .nest_service("/images", ServeDir::new(images_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
