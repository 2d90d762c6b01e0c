// Authentication error taxonomy and audit logging helpers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use thiserror::Error;

use crate::utils::api_response::ApiResponse;

/// Authentication-specific errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email not verified")]
    EmailNotVerified,

    #[error("Account is inactive")]
    AccountInactive,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Token generation failed: {0}")]
    TokenError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Session expired")]
    SessionExpired,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Internal server error")]
    InternalError,
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::EmailNotVerified => StatusCode::FORBIDDEN,
            AuthError::AccountInactive => StatusCode::FORBIDDEN,
            AuthError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::TokenError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::SessionExpired => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::EmailNotVerified => "EMAIL_NOT_VERIFIED",
            AuthError::AccountInactive => "ACCOUNT_INACTIVE",
            AuthError::DatabaseError(_) => "DATABASE_ERROR",
            AuthError::TokenError(_) => "TOKEN_ERROR",
            AuthError::ValidationError(_) => "VALIDATION_ERROR",
            AuthError::UserNotFound => "USER_NOT_FOUND",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::SessionExpired => "SESSION_EXPIRED",
            AuthError::Forbidden => "FORBIDDEN",
            AuthError::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Client-facing message. Internal error details never leave the server;
    /// they are logged and replaced with a generic description.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::DatabaseError(detail) => {
                tracing::error!(detail = %detail, "Database error during auth operation");
                "An internal error occurred".to_string()
            },
            AuthError::TokenError(detail) => {
                tracing::error!(detail = %detail, "Token generation failed");
                "An internal error occurred".to_string()
            },
            AuthError::InternalError => "An internal error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = ApiResponse::<()>::error(
            status,
            self.error_code(),
            self.public_message(),
        );
        (status, Json(body)).into_response()
    }
}

/// Structured audit event for authentication and account lifecycle changes.
/// Emitted as a tracing event so log aggregation can filter on `audit = true`.
#[derive(Debug, Serialize)]
pub enum AuthEventType {
    RegisterSuccess,
    LoginSuccess,
    LoginFailed,
    TokenRefreshed,
    PasswordResetRequested,
    PasswordResetCompleted,
    EmailVerified,
    SessionRevoked,
}

impl AuthEventType {
    fn as_str(&self) -> &'static str {
        match self {
            AuthEventType::RegisterSuccess => "register_success",
            AuthEventType::LoginSuccess => "login_success",
            AuthEventType::LoginFailed => "login_failed",
            AuthEventType::TokenRefreshed => "token_refreshed",
            AuthEventType::PasswordResetRequested => "password_reset_requested",
            AuthEventType::PasswordResetCompleted => "password_reset_completed",
            AuthEventType::EmailVerified => "email_verified",
            AuthEventType::SessionRevoked => "session_revoked",
        }
    }
}

/// Emit an audit event for an authentication lifecycle change
pub fn audit_auth_event(event: AuthEventType, user_id: Option<uuid::Uuid>, email: &str) {
    tracing::info!(
        audit = true,
        event = event.as_str(),
        user_id = user_id.map(|id| id.to_string()).unwrap_or_default(),
        email = email,
        "Auth audit event"
    );
}

/// Log an authentication failure with enough context to investigate
pub fn log_auth_failure(user_email: &str, error: &AuthError) {
    tracing::warn!(
        email = user_email,
        error_code = error.error_code(),
        "Authentication failure"
    );
}
