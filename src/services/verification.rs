// Email verification flow
// Issues one-time verification tokens and flips the user to verified when
// a token is consumed. Consumption happens before the verification
// transaction so the delete of an expired token survives the rejection.

use diesel_async::AsyncConnection;
use thiserror::Error;

use crate::app_config::config;
use crate::db::DieselPool;
use crate::models::user::{User, UserError};
use crate::models::verification_token::{EmailVerificationToken, TokenError};
use crate::services::email::{EmailDispatcher, EmailJob};
use crate::utils::auth_errors::{audit_auth_event, AuthEventType};

#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Pool error: {0}")]
    PoolError(String),

    #[error("Invalid verification token")]
    InvalidToken,

    #[error("Verification token expired")]
    TokenExpired,

    #[error("User not found")]
    UserNotFound,

    #[error("Email already verified")]
    AlreadyVerified,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<diesel::result::Error> for VerificationError {
    fn from(err: diesel::result::Error) -> Self {
        VerificationError::Database(err.to_string())
    }
}

impl From<TokenError> for VerificationError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => VerificationError::InvalidToken,
            TokenError::Expired => VerificationError::TokenExpired,
            TokenError::Database(e) => VerificationError::Database(e.to_string()),
        }
    }
}

impl From<UserError> for VerificationError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound => VerificationError::UserNotFound,
            other => VerificationError::Database(other.to_string()),
        }
    }
}

pub struct VerificationService {
    db_pool: DieselPool,
    dispatcher: EmailDispatcher,
}

impl VerificationService {
    pub fn new(db_pool: DieselPool, dispatcher: EmailDispatcher) -> Self {
        Self {
            db_pool,
            dispatcher,
        }
    }

    /// Issue a fresh verification token for a user and queue the email.
    /// Any earlier outstanding tokens for the address are dropped first,
    /// so only the newest link works.
    pub async fn send_verification(&self, user: &User) -> Result<(), VerificationError> {
        if user.is_verified() {
            return Err(VerificationError::AlreadyVerified);
        }

        let ttl = config().tokens.email_verification_expiry;

        let token = {
            let mut conn = self
                .db_pool
                .get()
                .await
                .map_err(|e| VerificationError::PoolError(e.to_string()))?;

            EmailVerificationToken::delete_all_for_email(&mut conn, &user.email).await?;
            EmailVerificationToken::issue(&mut conn, &user.email, ttl).await?
        };

        self.dispatcher.enqueue(EmailJob::Verification {
            to_email: user.email.clone(),
            user_name: user.full_name.clone(),
            token,
            expiry_secs: ttl,
        });

        Ok(())
    }

    /// Consume a verification token and mark the matching user verified.
    /// Returns the verified email address.
    pub async fn verify_email(&self, token: &str) -> Result<String, VerificationError> {
        let mut conn = self
            .db_pool
            .get()
            .await
            .map_err(|e| VerificationError::PoolError(e.to_string()))?;

        // Consume outside the transaction: when the token is expired the
        // rejection must still delete the row, and a rollback would undo
        // that delete.
        let row = EmailVerificationToken::consume(&mut conn, token).await?;

        let email_addr = row.email.clone();
        conn.transaction::<_, VerificationError, _>(|tx| {
            Box::pin(async move {
                let user = User::find_by_email(tx, &row.email).await?;
                User::mark_email_verified(tx, &row.email).await?;

                // Stale sibling tokens for the same address die with
                // the consumed one
                EmailVerificationToken::delete_all_for_email(tx, &row.email).await?;

                audit_auth_event(AuthEventType::EmailVerified, Some(user.id), &user.email);
                Ok(())
            })
        })
        .await?;

        Ok(email_addr)
    }
}
