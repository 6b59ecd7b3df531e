pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::auth::handlers as users;
use crate::cover_letter::handlers as analysis;
use crate::documents::{jobs, resumes};
use crate::state::AppState;

/// Multipart overhead on top of the largest accepted resume.
const BODY_LIMIT_BYTES: usize = resumes::MAX_RESUME_BYTES + 2 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Accounts
        .route("/api/users/register", post(users::handle_register))
        .route("/api/users/login", post(users::handle_login))
        .route("/api/users/logout", post(users::handle_logout))
        .route(
            "/api/users/profile",
            get(users::handle_get_profile).patch(users::handle_update_profile),
        )
        .route(
            "/api/users/change-password",
            put(users::handle_change_password),
        )
        .route(
            "/api/users/reset-password",
            post(users::handle_reset_password_request),
        )
        .route(
            "/api/users/reset-password-confirm",
            post(users::handle_reset_password_confirm),
        )
        .route(
            "/api/users/resend-verification",
            post(users::handle_resend_verification),
        )
        .route(
            "/api/users/activate/:uid/:token",
            get(users::handle_verify_email),
        )
        .route("/api/token/refresh", post(users::handle_refresh))
        // Documents
        .route(
            "/api/resumes",
            get(resumes::handle_list_resumes).post(resumes::handle_upload_resume),
        )
        .route(
            "/api/resumes/:id",
            get(resumes::handle_get_resume).delete(resumes::handle_delete_resume),
        )
        .route(
            "/api/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route("/api/jobs/:id", get(jobs::handle_get_job))
        // Analysis
        .route(
            "/api/analysis/generate-cover-letter",
            post(analysis::handle_generate_cover_letter),
        )
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests;
