// Shared utilities

pub mod api_response;
pub mod auth_errors;
pub mod password;
pub mod validation;

pub use api_response::{ApiResponse, ErrorDetail, ResponseMeta};
pub use auth_errors::{audit_auth_event, log_auth_failure, AuthError, AuthEventType};
pub use password::{hash_password, verify_password, PasswordError};
