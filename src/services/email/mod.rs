// Email service
// Builders render handlebars templates into messages, the sender delivers
// them over the provider API, and the dispatcher decouples request
// handlers from delivery latency with a fire-and-forget queue.

pub mod builders;
pub mod sender;
pub mod types;

use self::types::EmailBuilder;
use crate::app_config::EmailConfig;
use anyhow::Result;
use builders::{PasswordResetEmailBuilder, VerificationEmailBuilder};
use handlebars::Handlebars;
use sender::EmailSender;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, instrument};

pub use types::{EmailError, EmailMessage};

#[derive(Clone)]
pub struct EmailService {
    sender: EmailSender,
    config: EmailConfig,
    templates: Arc<Handlebars<'static>>,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Result<Self> {
        let mut templates = Handlebars::new();
        Self::register_templates(&mut templates)?;

        let sender = EmailSender::new(config.api_url.clone(), config.api_key.clone())
            .with_max_retries(3)
            .with_retry_delay(std::time::Duration::from_secs(1));

        Ok(Self {
            sender,
            config,
            templates: Arc::new(templates),
        })
    }

    fn register_templates(templates: &mut Handlebars) -> Result<(), types::EmailError> {
        let verify_template = include_str!("../../../templates/email/verify_email.html");
        templates
            .register_template_string("verify_email", verify_template)
            .map_err(|e| types::EmailError::TemplateError(e.to_string()))?;

        let reset_template = include_str!("../../../templates/email/password_reset.html");
        templates
            .register_template_string("password_reset", reset_template)
            .map_err(|e| types::EmailError::TemplateError(e.to_string()))?;

        Ok(())
    }

    /// Send the verification link email
    #[instrument(skip(self, token))]
    pub async fn send_verification_email(
        &self,
        to_email: &str,
        user_name: &str,
        token: &str,
        expiry_secs: u64,
    ) -> Result<(), types::EmailError> {
        info!("Sending verification email to {}", to_email);

        let builder = VerificationEmailBuilder::new(
            to_email,
            user_name,
            token,
            expiry_secs,
            &self.config,
            &self.templates,
        );

        let message = builder.build()?;
        self.sender.send_with_retry(message).await
    }

    /// Send the password reset link email
    #[instrument(skip(self, token))]
    pub async fn send_password_reset_email(
        &self,
        to_email: &str,
        user_name: &str,
        token: &str,
        expiry_secs: u64,
    ) -> Result<(), types::EmailError> {
        info!("Sending password reset email to {}", to_email);

        let builder = PasswordResetEmailBuilder::new(
            to_email,
            user_name,
            token,
            expiry_secs,
            &self.config,
            &self.templates,
        );

        let message = builder.build()?;
        self.sender.send_with_retry(message).await
    }
}

/// Work item queued on the dispatcher
#[derive(Debug)]
pub enum EmailJob {
    Verification {
        to_email: String,
        user_name: String,
        token: String,
        expiry_secs: u64,
    },
    PasswordReset {
        to_email: String,
        user_name: String,
        token: String,
        expiry_secs: u64,
    },
}

/// Fire-and-forget email queue. Handlers enqueue and move on; a worker
/// task drains the channel and delivers with retry. A full or closed
/// queue loses the email but never fails the originating request.
#[derive(Clone)]
pub struct EmailDispatcher {
    tx: mpsc::Sender<EmailJob>,
}

impl EmailDispatcher {
    /// Spawn the delivery worker and return the handle used to enqueue
    pub fn start(service: EmailService) -> Self {
        let (tx, mut rx) = mpsc::channel::<EmailJob>(256);

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let result = match &job {
                    EmailJob::Verification {
                        to_email,
                        user_name,
                        token,
                        expiry_secs,
                    } => {
                        service
                            .send_verification_email(to_email, user_name, token, *expiry_secs)
                            .await
                    },
                    EmailJob::PasswordReset {
                        to_email,
                        user_name,
                        token,
                        expiry_secs,
                    } => {
                        service
                            .send_password_reset_email(to_email, user_name, token, *expiry_secs)
                            .await
                    },
                };

                if let Err(e) = result {
                    error!(error = %e, "Email delivery failed after retries");
                }
            }
            info!("Email dispatcher worker stopped");
        });

        Self { tx }
    }

    /// Enqueue without waiting for delivery
    pub fn enqueue(&self, job: EmailJob) {
        if let Err(e) = self.tx.try_send(job) {
            error!(error = %e, "Failed to enqueue email job");
        }
    }
}
