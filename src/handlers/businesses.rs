// Business administration handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    models::business::{Business, BusinessError},
    services::rbac::ROLE_OWNER,
    utils::{api_response::ApiResponse, auth_errors::AuthError},
};

/// DELETE /v1/businesses/:id
///
/// Owner-only. Soft-deletes the business with its subscriptions and
/// locations, removes role links and hard-deletes the owner account, all
/// in one transaction.
pub async fn delete_business(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(business_id): Path<Uuid>,
) -> Response {
    if !user.has_role(business_id, &[ROLE_OWNER]) {
        return AuthError::Forbidden.into_response();
    }

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(error = %e, "Pool exhausted deleting business");
            return AuthError::InternalError.into_response();
        },
    };

    match Business::delete_cascade(&mut conn, business_id).await {
        Ok(()) => {
            tracing::info!(business_id = %business_id, "Business deleted");
            let body = ApiResponse::ok(serde_json::json!({}), "Business deleted");
            (StatusCode::OK, Json(body)).into_response()
        },
        Err(BusinessError::NotFound) => {
            let body = ApiResponse::<()>::error(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Business not found",
            );
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        },
        Err(e) => {
            tracing::error!(error = %e, "Business delete cascade failed");
            AuthError::InternalError.into_response()
        },
    }
}
