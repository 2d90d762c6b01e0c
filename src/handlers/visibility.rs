// Visibility read endpoints: stored metrics, the rank heatmap, and the
// share-of-voice breakdown. All require membership in the business.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;
use std::str::FromStr;
use uuid::Uuid;

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    models::visibility_metric::{PeriodType, VisibilityMetric},
    services::visibility::window_bounds,
    utils::{api_response::ApiResponse, auth_errors::AuthError},
};

#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    pub business_id: Uuid,
    pub period_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HeatmapQuery {
    pub business_id: Uuid,
    pub location_id: Option<Uuid>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct SovQuery {
    pub business_id: Uuid,
    pub location_id: Option<Uuid>,
    pub period_type: Option<String>,
}

fn bad_request(message: impl Into<String>) -> Response {
    let body = ApiResponse::<()>::error(
        StatusCode::BAD_REQUEST,
        "VALIDATION_ERROR",
        message.into(),
    );
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

fn parse_period(raw: Option<&str>) -> Result<Option<PeriodType>, Response> {
    match raw {
        None => Ok(None),
        Some(s) => PeriodType::from_str(s)
            .map(Some)
            .map_err(|e| bad_request(e)),
    }
}

/// GET /v1/visibility/metrics?business_id=...&period_type=daily
pub async fn metrics(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<MetricsQuery>,
) -> Response {
    if !user.is_member_of(query.business_id) {
        return AuthError::Forbidden.into_response();
    }

    let period = match parse_period(query.period_type.as_deref()) {
        Ok(period) => period,
        Err(response) => return response,
    };

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(error = %e, "Pool exhausted reading metrics");
            return AuthError::InternalError.into_response();
        },
    };

    match VisibilityMetric::list_for_business(&mut conn, query.business_id, period).await {
        Ok(metrics) => {
            let body = ApiResponse::ok(metrics, "Visibility metrics");
            (StatusCode::OK, Json(body)).into_response()
        },
        Err(e) => {
            tracing::error!(error = %e, "Metric read failed");
            AuthError::InternalError.into_response()
        },
    }
}

/// GET /v1/visibility/heatmap?business_id=...&start=...&end=...
///
/// Defaults to the trailing 30 days when no range is given.
pub async fn heatmap(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<HeatmapQuery>,
) -> Response {
    if !user.is_member_of(query.business_id) {
        return AuthError::Forbidden.into_response();
    }

    let end = query.end.unwrap_or_else(|| Utc::now().date_naive());
    let start = query.start.unwrap_or(end - Duration::days(29));

    if start > end {
        return bad_request("start must not be after end");
    }
    if (end - start).num_days() > 366 {
        return bad_request("Range must not exceed one year");
    }

    match state
        .heatmap_service
        .heatmap(query.business_id, query.location_id, start, end)
        .await
    {
        Ok(heatmap) => {
            let body = ApiResponse::ok(heatmap, "Rank heatmap");
            (StatusCode::OK, Json(body)).into_response()
        },
        Err(e) => {
            tracing::error!(error = %e, "Heatmap build failed");
            AuthError::InternalError.into_response()
        },
    }
}

/// GET /v1/visibility/share-of-voice?business_id=...&period_type=daily
pub async fn share_of_voice(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<SovQuery>,
) -> Response {
    if !user.is_member_of(query.business_id) {
        return AuthError::Forbidden.into_response();
    }

    let period = match parse_period(query.period_type.as_deref()) {
        Ok(period) => period.unwrap_or(PeriodType::Daily),
        Err(response) => return response,
    };

    let (start, end) = window_bounds(period, Utc::now());

    match state
        .heatmap_service
        .sov_breakdown(query.business_id, query.location_id, start, end)
        .await
    {
        Ok(breakdown) => {
            let body = ApiResponse::ok(breakdown, "Share of voice breakdown");
            (StatusCode::OK, Json(body)).into_response()
        },
        Err(e) => {
            tracing::error!(error = %e, "Share of voice build failed");
            AuthError::InternalError.into_response()
        },
    }
}
