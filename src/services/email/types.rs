// Shared types for the email module

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Failed to send email: {0}")]
    SendError(String),

    #[error("Template rendering error: {0}")]
    TemplateError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Service unavailable")]
    ServiceUnavailable,
}

/// Provider-agnostic email message
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl EmailMessage {
    pub fn new(from: String, to: Vec<String>, subject: String, html: String) -> Self {
        Self {
            from,
            to,
            subject,
            html,
            text: None,
        }
    }

    pub fn with_text(mut self, text: String) -> Self {
        self.text = Some(text);
        self
    }
}

/// Trait that all email builders implement
pub trait EmailBuilder {
    fn build(&self) -> Result<EmailMessage, EmailError>;
}

/// Template data for the verification email
#[derive(Serialize)]
pub struct VerificationEmailData {
    pub verify_url: String,
    pub user_name: String,
    pub app_name: String,
    pub dashboard_url: String,
    pub expiry_hours: u32,
}

/// Template data for the password reset email
#[derive(Serialize)]
pub struct PasswordResetEmailData {
    pub reset_url: String,
    pub user_name: String,
    pub app_name: String,
    pub dashboard_url: String,
    pub expiry_minutes: u32,
}
