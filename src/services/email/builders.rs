// Builders for the transactional email types

use super::types::{
    EmailBuilder, EmailError, EmailMessage, PasswordResetEmailData, VerificationEmailData,
};
use crate::app_config::EmailConfig;
use handlebars::Handlebars;
use tracing::instrument;

/// Builder for email verification messages carrying a one-time link
pub struct VerificationEmailBuilder<'a> {
    to_email: &'a str,
    user_name: &'a str,
    token: &'a str,
    expiry_secs: u64,
    config: &'a EmailConfig,
    templates: &'a Handlebars<'a>,
}

impl<'a> VerificationEmailBuilder<'a> {
    pub fn new(
        to_email: &'a str,
        user_name: &'a str,
        token: &'a str,
        expiry_secs: u64,
        config: &'a EmailConfig,
        templates: &'a Handlebars<'a>,
    ) -> Self {
        Self {
            to_email,
            user_name,
            token,
            expiry_secs,
            config,
            templates,
        }
    }
}

impl<'a> EmailBuilder for VerificationEmailBuilder<'a> {
    #[instrument(skip(self))]
    fn build(&self) -> Result<EmailMessage, EmailError> {
        let data = VerificationEmailData {
            verify_url: format!(
                "{}/verify-email?token={}",
                self.config.dashboard_url, self.token
            ),
            user_name: self.user_name.to_string(),
            app_name: self.config.from_name.clone(),
            dashboard_url: self.config.dashboard_url.clone(),
            expiry_hours: (self.expiry_secs / 3600) as u32,
        };

        let html = self
            .templates
            .render("verify_email", &data)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let text = format!(
            "Hi {},\n\n\
            Confirm your email address by opening this link:\n\
            {}\n\n\
            The link expires in {} hours. If you didn't create an account,\n\
            you can ignore this email.\n\n\
            The {} Team",
            self.user_name, data.verify_url, data.expiry_hours, self.config.from_name
        );

        Ok(EmailMessage::new(
            format!("{} <{}>", self.config.from_name, self.config.from_email),
            vec![self.to_email.to_string()],
            format!("Verify your {} email address", self.config.from_name),
            html,
        )
        .with_text(text))
    }
}

/// Builder for password reset messages
pub struct PasswordResetEmailBuilder<'a> {
    to_email: &'a str,
    user_name: &'a str,
    token: &'a str,
    expiry_secs: u64,
    config: &'a EmailConfig,
    templates: &'a Handlebars<'a>,
}

impl<'a> PasswordResetEmailBuilder<'a> {
    pub fn new(
        to_email: &'a str,
        user_name: &'a str,
        token: &'a str,
        expiry_secs: u64,
        config: &'a EmailConfig,
        templates: &'a Handlebars<'a>,
    ) -> Self {
        Self {
            to_email,
            user_name,
            token,
            expiry_secs,
            config,
            templates,
        }
    }
}

impl<'a> EmailBuilder for PasswordResetEmailBuilder<'a> {
    #[instrument(skip(self))]
    fn build(&self) -> Result<EmailMessage, EmailError> {
        let data = PasswordResetEmailData {
            reset_url: format!(
                "{}/reset-password?token={}",
                self.config.dashboard_url, self.token
            ),
            user_name: self.user_name.to_string(),
            app_name: self.config.from_name.clone(),
            dashboard_url: self.config.dashboard_url.clone(),
            expiry_minutes: (self.expiry_secs / 60) as u32,
        };

        let html = self
            .templates
            .render("password_reset", &data)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let text = format!(
            "Hi {},\n\n\
            We received a request to reset your password. Open this link to\n\
            choose a new one:\n\
            {}\n\n\
            The link expires in {} minutes. If you didn't request a reset,\n\
            you can ignore this email and your password will stay unchanged.\n\n\
            The {} Team",
            self.user_name, data.reset_url, data.expiry_minutes, self.config.from_name
        );

        Ok(EmailMessage::new(
            format!("{} <{}>", self.config.from_name, self.config.from_email),
            vec![self.to_email.to_string()],
            format!("Reset your {} password", self.config.from_name),
            html,
        )
        .with_text(text))
    }
}
