// HTTP handlers grouped by resource.

pub mod auth;
pub mod businesses;
pub mod jobs;
pub mod keywords;
pub mod visibility;

use crate::app::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};

// Authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh-token", post(auth::refresh_token))
        .route("/logout", post(auth::logout))
        .route("/verify-email", post(auth::verify_email))
        .route("/resend-verification", post(auth::resend_verification))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
}

// Keyword management routes (require authentication)
pub fn keyword_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(keywords::list_keywords).post(keywords::create_keyword))
        .route(
            "/{id}",
            axum::routing::put(keywords::update_keyword).delete(keywords::delete_keyword),
        )
        .route("/{id}/archive", post(keywords::archive_keyword))
}

// Visibility reporting routes (require authentication)
pub fn visibility_routes() -> Router<AppState> {
    Router::new()
        .route("/metrics", get(visibility::metrics))
        .route("/heatmap", get(visibility::heatmap))
        .route("/share-of-voice", get(visibility::share_of_voice))
}

// Manual job triggers (require authentication, owner role)
pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/rank-tracking/daily", post(jobs::trigger_daily_tracking))
        .route("/compute-visibility", post(jobs::trigger_compute_visibility))
}

// Business administration routes (require authentication)
pub fn business_routes() -> Router<AppState> {
    Router::new().route("/{id}", delete(businesses::delete_business))
}
