// Email delivery over the provider's HTTP API, with bounded retry

use super::types::{EmailError, EmailMessage};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

#[derive(Clone)]
pub struct EmailSender {
    client: Arc<Client>,
    api_key: String,
    api_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl EmailSender {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: Arc::new(Client::new()),
            api_key,
            api_url,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    #[instrument(skip(self, message), fields(to = ?message.to, subject = %message.subject))]
    pub async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&message)
            .send()
            .await;

        match response {
            Ok(res) if res.status().is_success() => {
                info!("Email sent successfully");
                Ok(())
            },
            Ok(res) => {
                let status = res.status();
                let error_text = res
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());

                error!(
                    "Failed to send email. Status: {}, Error: {}",
                    status, error_text
                );

                if status.as_u16() == 429 {
                    Err(EmailError::RateLimitExceeded)
                } else if status.is_server_error() {
                    Err(EmailError::ServiceUnavailable)
                } else {
                    Err(EmailError::SendError(format!(
                        "Email send failed with status {}: {}",
                        status, error_text
                    )))
                }
            },
            Err(e) => {
                error!("Network error while sending email: {:?}", e);
                Err(EmailError::SendError(format!("Network error: {}", e)))
            },
        }
    }

    /// Send with exponential backoff between attempts. Rate-limit
    /// responses are not retried.
    #[instrument(skip(self, message), fields(to = ?message.to, subject = %message.subject))]
    pub async fn send_with_retry(&self, message: EmailMessage) -> Result<(), EmailError> {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match self.send(message.clone()).await {
                Ok(()) => return Ok(()),
                Err(EmailError::RateLimitExceeded) => {
                    warn!("Rate limit hit, not retrying");
                    return Err(EmailError::RateLimitExceeded);
                },
                Err(e) => {
                    warn!("Email send attempt {} failed: {:?}", attempt, e);
                    last_error = Some(e);

                    if attempt < self.max_retries {
                        let max_delay = Duration::from_secs(60);
                        let exp = 2_u32.checked_pow(attempt - 1).unwrap_or(u32::MAX);
                        let delay = self
                            .retry_delay
                            .checked_mul(exp)
                            .unwrap_or(max_delay)
                            .min(max_delay);

                        info!("Retrying in {:?}", delay);
                        tokio::time::sleep(delay).await;
                    }
                },
            }
        }

        Err(last_error.unwrap_or_else(|| {
            EmailError::SendError("Failed after maximum retry attempts".to_string())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_message_builder() {
        let message = EmailMessage::new(
            "sender@example.com".to_string(),
            vec!["recipient@example.com".to_string()],
            "Test Subject".to_string(),
            "<h1>Test</h1>".to_string(),
        )
        .with_text("Test".to_string());

        assert_eq!(message.from, "sender@example.com");
        assert_eq!(message.to, vec!["recipient@example.com"]);
        assert_eq!(message.subject, "Test Subject");
        assert_eq!(message.html, "<h1>Test</h1>");
        assert_eq!(message.text, Some("Test".to_string()));
    }

    #[test]
    fn test_backoff_is_capped() {
        let sender = EmailSender::new(
            "https://mail.example.com/send".to_string(),
            "test_key".to_string(),
        )
        .with_retry_delay(Duration::from_secs(2));

        let max_delay = Duration::from_secs(60);
        let exp = 2_u32.checked_pow(50 - 1).unwrap_or(u32::MAX);
        let delay = sender
            .retry_delay
            .checked_mul(exp)
            .unwrap_or(max_delay)
            .min(max_delay);

        assert_eq!(delay, Duration::from_secs(60));
    }
}
