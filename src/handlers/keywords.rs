// Keyword management handlers
// Write operations require OWNER or MANAGER in the keyword's business;
// reads are open to any member.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    models::keyword::{Keyword, KeywordError, KeywordStatus, KeywordUpdate, NewKeyword},
    services::rbac::{ROLE_MANAGER, ROLE_OWNER},
    utils::{api_response::ApiResponse, auth_errors::AuthError, validation::normalize_keyword},
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateKeywordRequest {
    pub business_id: Uuid,
    pub location_id: Option<Uuid>,

    #[validate(length(
        min = 1,
        max = 512,
        message = "Keyword must be between 1 and 512 characters"
    ))]
    pub keyword: String,

    #[validate(range(min = 0, message = "Search volume must not be negative"))]
    pub search_volume: i32,

    #[validate(range(min = 0, max = 100, message = "Difficulty must be between 0 and 100"))]
    pub difficulty: Option<i32>,

    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateKeywordRequest {
    #[validate(length(
        min = 1,
        max = 512,
        message = "Keyword must be between 1 and 512 characters"
    ))]
    pub keyword: Option<String>,

    #[validate(range(min = 0, message = "Search volume must not be negative"))]
    pub search_volume: Option<i32>,

    /// Absent leaves the stored value alone; an explicit `null` clears it
    #[serde(default, deserialize_with = "double_option")]
    pub difficulty: Option<Option<i32>>,

    pub tags: Option<Vec<String>>,
}

/// Keeps an absent field distinguishable from an explicit JSON null
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(de).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct ListKeywordsQuery {
    pub business_id: Uuid,
}

fn bad_request(message: impl Into<String>) -> Response {
    let body = ApiResponse::<()>::error(
        StatusCode::BAD_REQUEST,
        "VALIDATION_ERROR",
        message.into(),
    );
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

fn not_found() -> Response {
    let body = ApiResponse::<()>::error(StatusCode::NOT_FOUND, "NOT_FOUND", "Keyword not found");
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}

/// Resolve a keyword and check the caller can modify it
async fn load_for_write(
    state: &AppState,
    user: &AuthenticatedUser,
    keyword_id: Uuid,
) -> Result<Keyword, Response> {
    let mut conn = state.diesel_pool.get().await.map_err(|e| {
        tracing::error!(error = %e, "Pool exhausted in keyword handler");
        AuthError::InternalError.into_response()
    })?;

    let keyword = Keyword::find_by_id(&mut conn, keyword_id)
        .await
        .map_err(|e| match e {
            KeywordError::NotFound => not_found(),
            other => {
                tracing::error!(error = %other, "Keyword lookup failed");
                AuthError::InternalError.into_response()
            },
        })?;

    if !user.has_role(keyword.business_id, &[ROLE_OWNER, ROLE_MANAGER]) {
        return Err(AuthError::Forbidden.into_response());
    }

    Ok(keyword)
}

/// GET /v1/keywords?business_id=...
pub async fn list_keywords(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListKeywordsQuery>,
) -> Response {
    if !user.is_member_of(query.business_id) {
        return AuthError::Forbidden.into_response();
    }

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(error = %e, "Pool exhausted listing keywords");
            return AuthError::InternalError.into_response();
        },
    };

    match Keyword::list_for_business(&mut conn, query.business_id).await {
        Ok(keywords) => {
            let body = ApiResponse::ok(keywords, "Keywords");
            (StatusCode::OK, Json(body)).into_response()
        },
        Err(e) => {
            tracing::error!(error = %e, "Keyword list failed");
            AuthError::InternalError.into_response()
        },
    }
}

/// POST /v1/keywords
pub async fn create_keyword(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateKeywordRequest>,
) -> Response {
    if let Err(errors) = payload.validate() {
        return bad_request(errors.to_string());
    }
    if !user.has_role(payload.business_id, &[ROLE_OWNER, ROLE_MANAGER]) {
        return AuthError::Forbidden.into_response();
    }

    let phrase = normalize_keyword(&payload.keyword);
    if phrase.is_empty() {
        return bad_request("Keyword must not be blank");
    }

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(error = %e, "Pool exhausted creating keyword");
            return AuthError::InternalError.into_response();
        },
    };

    match Keyword::create(
        &mut conn,
        NewKeyword {
            business_id: payload.business_id,
            location_id: payload.location_id,
            keyword: phrase,
            search_volume: payload.search_volume,
            difficulty: payload.difficulty,
            tags: payload.tags,
            status: KeywordStatus::Active.as_str().to_string(),
        },
    )
    .await
    {
        Ok(keyword) => {
            let body = ApiResponse::created(keyword, "Keyword created");
            (StatusCode::CREATED, Json(body)).into_response()
        },
        Err(e) => {
            tracing::error!(error = %e, "Keyword create failed");
            AuthError::InternalError.into_response()
        },
    }
}

/// PUT /v1/keywords/:id
pub async fn update_keyword(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(keyword_id): Path<Uuid>,
    Json(payload): Json<UpdateKeywordRequest>,
) -> Response {
    if let Err(errors) = payload.validate() {
        return bad_request(errors.to_string());
    }
    if let Some(Some(d)) = payload.difficulty {
        if !(0..=100).contains(&d) {
            return bad_request("Difficulty must be between 0 and 100");
        }
    }

    let existing = match load_for_write(&state, &user, keyword_id).await {
        Ok(keyword) => keyword,
        Err(response) => return response,
    };

    let phrase = payload.keyword.as_deref().map(normalize_keyword);
    if phrase.as_deref() == Some("") {
        return bad_request("Keyword must not be blank");
    }

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(error = %e, "Pool exhausted updating keyword");
            return AuthError::InternalError.into_response();
        },
    };

    match Keyword::update(
        &mut conn,
        existing.id,
        KeywordUpdate {
            keyword: phrase,
            search_volume: payload.search_volume,
            difficulty: payload.difficulty,
            tags: payload.tags,
            status: None,
            updated_at: Utc::now(),
        },
    )
    .await
    {
        Ok(keyword) => {
            let body = ApiResponse::ok(keyword, "Keyword updated");
            (StatusCode::OK, Json(body)).into_response()
        },
        Err(KeywordError::NotFound) => not_found(),
        Err(e) => {
            tracing::error!(error = %e, "Keyword update failed");
            AuthError::InternalError.into_response()
        },
    }
}

/// POST /v1/keywords/:id/archive
///
/// Archived keywords stop being tracked and drop out of aggregation but
/// keep their history.
pub async fn archive_keyword(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(keyword_id): Path<Uuid>,
) -> Response {
    let existing = match load_for_write(&state, &user, keyword_id).await {
        Ok(keyword) => keyword,
        Err(response) => return response,
    };

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(error = %e, "Pool exhausted archiving keyword");
            return AuthError::InternalError.into_response();
        },
    };

    match Keyword::archive(&mut conn, existing.id).await {
        Ok(keyword) => {
            let body = ApiResponse::ok(keyword, "Keyword archived");
            (StatusCode::OK, Json(body)).into_response()
        },
        Err(KeywordError::NotFound) => not_found(),
        Err(e) => {
            tracing::error!(error = %e, "Keyword archive failed");
            AuthError::InternalError.into_response()
        },
    }
}

/// DELETE /v1/keywords/:id — hard delete, rank history goes with it
pub async fn delete_keyword(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(keyword_id): Path<Uuid>,
) -> Response {
    let existing = match load_for_write(&state, &user, keyword_id).await {
        Ok(keyword) => keyword,
        Err(response) => return response,
    };

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(error = %e, "Pool exhausted deleting keyword");
            return AuthError::InternalError.into_response();
        },
    };

    match Keyword::delete(&mut conn, existing.id).await {
        Ok(()) => {
            let body = ApiResponse::ok(serde_json::json!({}), "Keyword deleted");
            (StatusCode::OK, Json(body)).into_response()
        },
        Err(KeywordError::NotFound) => not_found(),
        Err(e) => {
            tracing::error!(error = %e, "Keyword delete failed");
            AuthError::InternalError.into_response()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_difficulty_absent_null_and_value() {
        let absent: UpdateKeywordRequest = serde_json::from_str("{}").expect("parse");
        assert_eq!(absent.difficulty, None);

        // Explicit null clears the stored value instead of being dropped
        let cleared: UpdateKeywordRequest =
            serde_json::from_str(r#"{"difficulty": null}"#).expect("parse");
        assert_eq!(cleared.difficulty, Some(None));

        let set: UpdateKeywordRequest =
            serde_json::from_str(r#"{"difficulty": 42}"#).expect("parse");
        assert_eq!(set.difficulty, Some(Some(42)));
    }
}
