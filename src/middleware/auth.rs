// Authentication middleware for protected routes
// Validates the bearer token and injects AuthenticatedUser into request
// extensions; handlers authorize against the embedded role map.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::app::AppState;
use crate::utils::api_response::ApiResponse;

/// Authenticated caller extracted from a validated access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub token_id: String,
    pub email: String,
    /// Role names per business id, as carried in the token
    pub roles: HashMap<Uuid, Vec<String>>,
    pub exp: u64,
}

impl AuthenticatedUser {
    /// Does the caller hold any of `wanted` in this business?
    pub fn has_role(&self, business_id: Uuid, wanted: &[&str]) -> bool {
        crate::services::rbac::claims_have_role(&self.roles, business_id, wanted)
    }

    /// Any relationship with the business at all
    pub fn is_member_of(&self, business_id: Uuid) -> bool {
        self.roles
            .get(&business_id)
            .map(|r| !r.is_empty())
            .unwrap_or(false)
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiResponse::<()>::error(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            message,
        )),
    )
        .into_response()
}

/// Validates the bearer token and adds AuthenticatedUser to extensions
pub async fn auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => return unauthorized("Missing or invalid authorization header"),
    };

    match app_state.jwt_service.validate_access_token(token) {
        Ok(claims) => {
            let user_id = match Uuid::parse_str(&claims.sub) {
                Ok(id) => id,
                Err(_) => {
                    tracing::warn!("Access token carried a non-UUID subject");
                    return unauthorized("Invalid or expired token");
                },
            };

            let auth_user = AuthenticatedUser {
                user_id,
                token_id: claims.jti,
                email: claims.email,
                roles: claims.roles,
                exp: claims.exp,
            };

            request.extensions_mut().insert(auth_user);
            next.run(request).await
        },
        Err(e) => {
            tracing::warn!("JWT validation failed: {}", e);
            unauthorized("Invalid or expired token")
        },
    }
}

/// Extractor so handlers can take AuthenticatedUser directly
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = (StatusCode, Json<ApiResponse<()>>);

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ApiResponse::<()>::error(
                        StatusCode::UNAUTHORIZED,
                        "UNAUTHORIZED",
                        "Authentication required",
                    )),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_role_and_membership() {
        let business = Uuid::new_v4();
        let mut roles = HashMap::new();
        roles.insert(business, vec!["MEMBER".to_string()]);

        let user = AuthenticatedUser {
            user_id: Uuid::new_v4(),
            token_id: "jti".to_string(),
            email: "user@example.com".to_string(),
            roles,
            exp: 0,
        };

        assert!(user.is_member_of(business));
        assert!(user.has_role(business, &["MEMBER", "OWNER"]));
        assert!(!user.has_role(business, &["OWNER"]));
        assert!(!user.is_member_of(Uuid::new_v4()));
    }
}
