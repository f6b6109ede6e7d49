pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};

use crate::backend::handlers as lookups;
use crate::intake::handlers;
use crate::state::AppState;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Intake flow
        .route("/api/v1/intake/sessions", post(handlers::handle_open_session))
        .route(
            "/api/v1/intake/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_cancel_session),
        )
        .route(
            "/api/v1/intake/sessions/:id/resume",
            post(handlers::handle_upload_resume),
        )
        .route(
            "/api/v1/intake/sessions/:id/candidate",
            put(handlers::handle_update_candidate),
        )
        .route(
            "/api/v1/intake/sessions/:id/certifications",
            post(handlers::handle_add_certification),
        )
        .route(
            "/api/v1/intake/sessions/:id/certifications/:cert_id",
            patch(handlers::handle_set_certification_type)
                .delete(handlers::handle_remove_certification),
        )
        .route(
            "/api/v1/intake/sessions/:id/certifications/:cert_id/file",
            post(handlers::handle_attach_certificate),
        )
        .route(
            "/api/v1/intake/sessions/:id/submit",
            post(handlers::handle_submit),
        )
        // Backend passthroughs
        .route("/api/v1/jobs", get(lookups::handle_search_jobs))
        .route("/api/v1/lookups/states", get(lookups::handle_states))
        .route("/api/v1/lookups/skills", get(lookups::handle_skills))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
