// Uniform API response envelope
// Every JSON endpoint wraps its payload in this structure so clients can
// branch on `success` without inspecting HTTP status codes.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub status_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

impl ResponseMeta {
    fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::OK, data, message)
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::CREATED, data, message)
    }

    pub fn accepted(data: T, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::ACCEPTED, data, message)
    }

    pub fn with_status(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            status_code: status.as_u16(),
            message: message.into(),
            data: Some(data),
            error: None,
            meta: ResponseMeta::new(),
        }
    }

    pub fn error(
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        Self {
            success: false,
            status_code: status.as_u16(),
            message: message.clone(),
            data: None,
            error: Some(ErrorDetail {
                code: code.into(),
                description: message,
            }),
            meta: ResponseMeta::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_shape() {
        let resp = ApiResponse::ok(serde_json::json!({"value": 1}), "done");
        let json = serde_json::to_value(&resp).expect("Failed to serialize response");

        assert_eq!(json["success"], true);
        assert_eq!(json["status_code"], 200);
        assert_eq!(json["message"], "done");
        assert_eq!(json["data"]["value"], 1);
        assert!(json.get("error").is_none(), "Success must omit error field");
        assert!(
            json["meta"]["request_id"].is_string(),
            "Meta must carry a request id"
        );
    }

    #[test]
    fn test_error_envelope_shape() {
        let resp = ApiResponse::<()>::error(
            StatusCode::UNAUTHORIZED,
            "INVALID_CREDENTIALS",
            "Invalid credentials",
        );
        let json = serde_json::to_value(&resp).expect("Failed to serialize response");

        assert_eq!(json["success"], false);
        assert_eq!(json["status_code"], 401);
        assert_eq!(json["error"]["code"], "INVALID_CREDENTIALS");
        assert!(json.get("data").is_none(), "Error must omit data field");
    }
}
