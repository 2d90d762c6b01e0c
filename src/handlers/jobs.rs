// Manual job triggers
// Both endpoints answer 202 immediately and run the work on a spawned
// task; progress is visible in the logs, not the response.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    services::rbac::ROLE_OWNER,
    utils::{api_response::ApiResponse, auth_errors::AuthError},
};

#[derive(Debug, Deserialize)]
pub struct ComputeVisibilityRequest {
    pub business_id: Uuid,
}

fn accepted(message: &str) -> Response {
    let body = ApiResponse::accepted(serde_json::json!({}), message);
    (StatusCode::ACCEPTED, Json(body)).into_response()
}

/// POST /jobs/rank-tracking/daily
///
/// Kicks off the full daily tracking pass out of schedule. Restricted to
/// callers who own at least one business.
pub async fn trigger_daily_tracking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Response {
    let owns_any = user
        .roles
        .values()
        .any(|roles| roles.iter().any(|r| r == ROLE_OWNER));
    if !owns_any {
        return AuthError::Forbidden.into_response();
    }

    let tracking = state.tracking_service.clone();
    tokio::spawn(async move {
        match tracking.run_daily_tracking().await {
            Ok(summary) => tracing::info!(
                processed = summary.businesses_processed,
                failed = summary.businesses_failed,
                records = summary.records_created,
                "Manual tracking run finished"
            ),
            Err(e) => tracing::error!(error = %e, "Manual tracking run failed"),
        }
    });

    accepted("Rank tracking run started")
}

/// POST /jobs/compute-visibility
pub async fn trigger_compute_visibility(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<ComputeVisibilityRequest>,
) -> Response {
    if !user.has_role(payload.business_id, &[ROLE_OWNER]) {
        return AuthError::Forbidden.into_response();
    }

    let visibility = state.visibility_service.clone();
    let business_id = payload.business_id;
    tokio::spawn(async move {
        match visibility.compute_all_windows(business_id, Utc::now()).await {
            Ok(metrics) => tracing::info!(
                business_id = %business_id,
                windows = metrics.len(),
                "Manual visibility recompute finished"
            ),
            Err(e) => tracing::error!(
                business_id = %business_id,
                error = %e,
                "Manual visibility recompute failed"
            ),
        }
    });

    accepted("Visibility computation started")
}
