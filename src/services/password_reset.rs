// Password reset flow
// Reset requests never reveal whether an account exists; the response is
// identical either way. Completing a reset consumes the token, rewrites
// the credential, and revokes every live session in one transaction.

use diesel_async::AsyncConnection;
use thiserror::Error;

use crate::app_config::config;
use crate::db::DieselPool;
use crate::models::session::Session;
use crate::models::user::{User, UserError};
use crate::models::verification_token::TokenError;
use crate::models::PasswordResetToken;
use crate::services::email::{EmailDispatcher, EmailJob};
use crate::utils::auth_errors::{audit_auth_event, AuthEventType};
use crate::utils::password::{hash_password, PasswordError};
use crate::utils::validation::validate_password_strength;

#[derive(Error, Debug)]
pub enum PasswordResetError {
    #[error("Pool error: {0}")]
    PoolError(String),

    #[error("Invalid reset token")]
    InvalidToken,

    #[error("Reset token expired")]
    TokenExpired,

    #[error("Password validation failed: {0}")]
    WeakPassword(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<diesel::result::Error> for PasswordResetError {
    fn from(err: diesel::result::Error) -> Self {
        PasswordResetError::Database(err.to_string())
    }
}

impl From<TokenError> for PasswordResetError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => PasswordResetError::InvalidToken,
            TokenError::Expired => PasswordResetError::TokenExpired,
            TokenError::Database(e) => PasswordResetError::Database(e.to_string()),
        }
    }
}

impl From<PasswordError> for PasswordResetError {
    fn from(err: PasswordError) -> Self {
        PasswordResetError::Hashing(err.to_string())
    }
}

pub struct PasswordResetService {
    db_pool: DieselPool,
    dispatcher: EmailDispatcher,
}

impl PasswordResetService {
    pub fn new(db_pool: DieselPool, dispatcher: EmailDispatcher) -> Self {
        Self {
            db_pool,
            dispatcher,
        }
    }

    /// Handle a reset request. Unknown addresses succeed silently so the
    /// endpoint cannot be used to enumerate accounts.
    pub async fn request_reset(&self, email: &str) -> Result<(), PasswordResetError> {
        let mut conn = self
            .db_pool
            .get()
            .await
            .map_err(|e| PasswordResetError::PoolError(e.to_string()))?;

        let user = match User::find_by_email(&mut conn, email).await {
            Ok(user) => user,
            Err(UserError::NotFound) => {
                tracing::debug!("Password reset requested for unknown email");
                return Ok(());
            },
            Err(e) => return Err(PasswordResetError::Database(e.to_string())),
        };

        let ttl = config().tokens.password_reset_expiry;
        let info = PasswordResetToken::generate(ttl);

        PasswordResetToken::delete_all_for_email(&mut conn, &user.email).await?;
        PasswordResetToken::store(&mut conn, &user.email, &info).await?;

        audit_auth_event(
            AuthEventType::PasswordResetRequested,
            Some(user.id),
            &user.email,
        );

        self.dispatcher.enqueue(EmailJob::PasswordReset {
            to_email: user.email.clone(),
            user_name: user.full_name.clone(),
            token: info.token,
            expiry_secs: ttl,
        });

        Ok(())
    }

    /// Complete a reset: consume the token, store the new credential and
    /// revoke every session the user holds
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), PasswordResetError> {
        validate_password_strength(new_password).map_err(PasswordResetError::WeakPassword)?;

        // Argon2 is CPU-bound; hash outside the transaction
        let password_hash = hash_password(new_password)?;

        let mut conn = self
            .db_pool
            .get()
            .await
            .map_err(|e| PasswordResetError::PoolError(e.to_string()))?;

        // Consume outside the transaction: an expired token is deleted by
        // the failed check, and that delete must not roll back with the
        // rejected request.
        let row = PasswordResetToken::consume(&mut conn, token).await?;

        conn.transaction::<_, PasswordResetError, _>(|tx| {
            Box::pin(async move {
                let user = User::find_by_email(tx, &row.email)
                    .await
                    .map_err(|e| match e {
                        // Token outlived the account; treat as invalid
                        UserError::NotFound => PasswordResetError::InvalidToken,
                        other => PasswordResetError::Database(other.to_string()),
                    })?;

                User::update_password(tx, user.id, &password_hash)
                    .await
                    .map_err(|e| PasswordResetError::Database(e.to_string()))?;

                PasswordResetToken::delete_all_for_email(tx, &row.email).await?;

                Session::revoke_all_for_user(tx, user.id)
                    .await
                    .map_err(|e| PasswordResetError::Database(e.to_string()))?;

                audit_auth_event(
                    AuthEventType::PasswordResetCompleted,
                    Some(user.id),
                    &user.email,
                );
                Ok(())
            })
        })
        .await
    }
}
