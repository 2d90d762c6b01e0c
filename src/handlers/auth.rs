// Authentication handlers: registration, login, token refresh and the
// email verification / password reset endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    app::AppState,
    app_config::config,
    models::{
        session::{Session, SessionError},
        user::{NewUser, User, UserError},
    },
    services::password_reset::PasswordResetError,
    services::verification::VerificationError,
    utils::{
        api_response::ApiResponse,
        auth_errors::{audit_auth_event, log_auth_failure, AuthError, AuthEventType},
        password::{hash_password, verify_password},
        validation::{normalize_email, validate_password_strength},
    },
};

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 320, message = "Email must be less than 320 characters"))]
    pub email: String,

    pub password: String,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Full name must be between 1 and 255 characters"
    ))]
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ResendVerificationRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: uuid::Uuid,
    pub email: String,
    pub full_name: String,
    pub email_verified: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            email_verified: user.is_verified(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

fn validation_failure(message: impl Into<String>) -> Response {
    let body = ApiResponse::<()>::error(
        StatusCode::BAD_REQUEST,
        "VALIDATION_ERROR",
        message.into(),
    );
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

// =============================================================================
// HANDLERS
// =============================================================================

/// POST /v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Response {
    if let Err(errors) = payload.validate() {
        return validation_failure(errors.to_string());
    }
    if let Err(msg) = validate_password_strength(&payload.password) {
        return validation_failure(msg);
    }

    let email = normalize_email(&payload.email);

    let password_hash = match hash_password(&payload.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!(error = %e, "Password hashing failed during registration");
            return AuthError::InternalError.into_response();
        },
    };

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(error = %e, "Pool exhausted during registration");
            return AuthError::InternalError.into_response();
        },
    };

    let user = match User::create(
        &mut conn,
        NewUser {
            email: email.clone(),
            password_hash,
            full_name: payload.full_name.trim().to_string(),
        },
    )
    .await
    {
        Ok(user) => user,
        Err(UserError::AlreadyExists) => {
            return validation_failure("An account with this email already exists");
        },
        Err(e) => {
            tracing::error!(error = %e, "Registration insert failed");
            return AuthError::InternalError.into_response();
        },
    };
    drop(conn);

    // Verification email is fire-and-forget; a delivery problem must not
    // fail the registration
    if let Err(e) = state.verification_service.send_verification(&user).await {
        tracing::error!(error = %e, "Failed to issue verification token");
    }

    audit_auth_event(AuthEventType::RegisterSuccess, Some(user.id), &user.email);

    let body = ApiResponse::created(
        UserResponse::from(&user),
        "Account created. Check your email to verify your address.",
    );
    (StatusCode::CREATED, Json(body)).into_response()
}

/// POST /v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Response {
    let email = normalize_email(&payload.email);

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(error = %e, "Pool exhausted during login");
            return AuthError::InternalError.into_response();
        },
    };

    let user = match User::find_by_email(&mut conn, &email).await {
        Ok(user) => user,
        Err(UserError::NotFound) => {
            log_auth_failure(&email, &AuthError::InvalidCredentials);
            return AuthError::InvalidCredentials.into_response();
        },
        Err(e) => {
            tracing::error!(error = %e, "User lookup failed during login");
            return AuthError::InternalError.into_response();
        },
    };

    match verify_password(&payload.password, &user.password_hash) {
        Ok(true) => {},
        Ok(false) => {
            log_auth_failure(&email, &AuthError::InvalidCredentials);
            return AuthError::InvalidCredentials.into_response();
        },
        Err(e) => {
            tracing::error!(error = %e, "Password verification failed");
            return AuthError::InternalError.into_response();
        },
    }

    if !user.is_active {
        log_auth_failure(&email, &AuthError::AccountInactive);
        return AuthError::AccountInactive.into_response();
    }
    if !user.is_verified() {
        log_auth_failure(&email, &AuthError::EmailNotVerified);
        return AuthError::EmailNotVerified.into_response();
    }

    let refresh_token =
        match Session::issue(&mut conn, user.id, config().tokens.session_expiry).await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!(error = %e, "Session issue failed");
                return AuthError::InternalError.into_response();
            },
        };
    drop(conn);

    let roles = match state.rbac_service.get_user_roles(user.id).await {
        Ok(roles) => roles,
        Err(e) => {
            tracing::error!(error = %e, "Role lookup failed during login");
            return AuthError::InternalError.into_response();
        },
    };

    let access_token = match state
        .jwt_service
        .generate_access_token(user.id, &user.email, roles)
    {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "Access token generation failed");
            return AuthError::InternalError.into_response();
        },
    };

    audit_auth_event(AuthEventType::LoginSuccess, Some(user.id), &user.email);

    let body = ApiResponse::ok(
        TokenResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: state.jwt_service.access_token_expiry(),
            user: UserResponse::from(&user),
        },
        "Login successful",
    );
    (StatusCode::OK, Json(body)).into_response()
}

/// POST /v1/auth/refresh-token
///
/// Mints a fresh access token against a live refresh session. The session
/// itself is not rotated; an expired session row is deleted by the check
/// and the caller gets 401, never a 500.
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Response {
    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(error = %e, "Pool exhausted during token refresh");
            return AuthError::InternalError.into_response();
        },
    };

    let session = match Session::find_valid(&mut conn, &payload.refresh_token).await {
        Ok(session) => session,
        Err(SessionError::Expired) => return AuthError::SessionExpired.into_response(),
        Err(SessionError::NotFound) => return AuthError::InvalidToken.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Session lookup failed during refresh");
            return AuthError::InternalError.into_response();
        },
    };

    let user = match User::find_by_id(&mut conn, session.user_id).await {
        Ok(user) => user,
        Err(UserError::NotFound) => return AuthError::InvalidToken.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "User lookup failed during refresh");
            return AuthError::InternalError.into_response();
        },
    };
    drop(conn);

    if !user.is_active {
        return AuthError::AccountInactive.into_response();
    }

    let roles = match state.rbac_service.get_user_roles(user.id).await {
        Ok(roles) => roles,
        Err(e) => {
            tracing::error!(error = %e, "Role lookup failed during refresh");
            return AuthError::InternalError.into_response();
        },
    };

    let access_token = match state
        .jwt_service
        .generate_access_token(user.id, &user.email, roles)
    {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "Access token generation failed during refresh");
            return AuthError::InternalError.into_response();
        },
    };

    audit_auth_event(AuthEventType::TokenRefreshed, Some(user.id), &user.email);

    let body = ApiResponse::ok(
        TokenResponse {
            access_token,
            refresh_token: payload.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: state.jwt_service.access_token_expiry(),
            user: UserResponse::from(&user),
        },
        "Token refreshed",
    );
    (StatusCode::OK, Json(body)).into_response()
}

/// POST /v1/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<LogoutRequest>,
) -> Response {
    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(error = %e, "Pool exhausted during logout");
            return AuthError::InternalError.into_response();
        },
    };

    match Session::revoke(&mut conn, &payload.refresh_token).await {
        Ok(_) => {
            // Revoking an already-dead session still reads as success
            let body = ApiResponse::ok(serde_json::json!({}), "Logged out");
            (StatusCode::OK, Json(body)).into_response()
        },
        Err(e) => {
            tracing::error!(error = %e, "Session revoke failed");
            AuthError::InternalError.into_response()
        },
    }
}

/// POST /v1/auth/forgot-password
///
/// Always answers with the same generic success so the endpoint cannot be
/// used to probe which addresses have accounts.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Response {
    let email = normalize_email(&payload.email);

    if let Err(e) = state.password_reset_service.request_reset(&email).await {
        // Internal failures are logged but still answered generically
        tracing::error!(error = %e, "Password reset request failed");
    }

    let body = ApiResponse::ok(
        serde_json::json!({}),
        "If an account exists for that address, a reset link has been sent.",
    );
    (StatusCode::OK, Json(body)).into_response()
}

/// POST /v1/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Response {
    match state
        .password_reset_service
        .reset_password(&payload.token, &payload.new_password)
        .await
    {
        Ok(()) => {
            let body = ApiResponse::ok(
                serde_json::json!({}),
                "Password updated. Please log in with your new password.",
            );
            (StatusCode::OK, Json(body)).into_response()
        },
        Err(PasswordResetError::InvalidToken) => AuthError::InvalidToken.into_response(),
        Err(PasswordResetError::TokenExpired) => AuthError::InvalidToken.into_response(),
        Err(PasswordResetError::WeakPassword(msg)) => validation_failure(msg),
        Err(e) => {
            tracing::error!(error = %e, "Password reset failed");
            AuthError::InternalError.into_response()
        },
    }
}

/// POST /v1/auth/verify-email
pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> Response {
    match state.verification_service.verify_email(&payload.token).await {
        Ok(email) => {
            let body = ApiResponse::ok(
                serde_json::json!({ "email": email }),
                "Email verified",
            );
            (StatusCode::OK, Json(body)).into_response()
        },
        Err(VerificationError::InvalidToken) | Err(VerificationError::TokenExpired) => {
            AuthError::InvalidToken.into_response()
        },
        Err(VerificationError::UserNotFound) => AuthError::InvalidToken.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Email verification failed");
            AuthError::InternalError.into_response()
        },
    }
}

/// POST /v1/auth/resend-verification
pub async fn resend_verification(
    State(state): State<AppState>,
    Json(payload): Json<ResendVerificationRequest>,
) -> Response {
    let email = normalize_email(&payload.email);

    let generic = || {
        let body = ApiResponse::ok(
            serde_json::json!({}),
            "If an unverified account exists for that address, a new link has been sent.",
        );
        (StatusCode::OK, Json(body)).into_response()
    };

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(error = %e, "Pool exhausted during resend");
            return AuthError::InternalError.into_response();
        },
    };

    let user = match User::find_by_email(&mut conn, &email).await {
        Ok(user) => user,
        Err(UserError::NotFound) => return generic(),
        Err(e) => {
            tracing::error!(error = %e, "User lookup failed during resend");
            return AuthError::InternalError.into_response();
        },
    };
    drop(conn);

    match state.verification_service.send_verification(&user).await {
        Ok(()) | Err(VerificationError::AlreadyVerified) => generic(),
        Err(e) => {
            tracing::error!(error = %e, "Resend verification failed");
            AuthError::InternalError.into_response()
        },
    }
}
