pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::courses::handlers as courses;
use crate::pipeline::handlers as pipeline;
use crate::state::AppState;

/// Uploaded curriculum PDFs are capped at 25 MiB.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/upload-curriculum",
            post(courses::handle_upload_curriculum),
        )
        .route("/generate-content", post(pipeline::handle_generate_content))
        .route("/status", get(courses::handle_status))
        .route("/generation/status", get(courses::handle_generation_status))
        .route("/files/:category", get(courses::handle_list_files))
        .route(
            "/download/:category/:filename",
            get(courses::handle_download),
        )
        .route("/courses", get(courses::handle_list_courses))
        .route("/courses/:slug", get(courses::handle_course_detail))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
