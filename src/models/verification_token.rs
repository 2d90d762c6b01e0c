// Email verification token model
// Single-use, 24h-bounded opaque token keyed by email. Consumption and
// expiry both end in deletion; DELETE .. RETURNING makes the consumption
// atomic so two concurrent attempts cannot both succeed.

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::email_verification_tokens;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = email_verification_tokens)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EmailVerificationToken {
    pub id: Uuid,
    pub email: String,
    pub token_hash: String,
    pub expires: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = email_verification_tokens)]
pub struct NewEmailVerificationToken {
    pub email: String,
    pub token_hash: String,
    pub expires: DateTime<Utc>,
}

#[derive(thiserror::Error, Debug)]
pub enum TokenError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Invalid token")]
    Invalid,

    #[error("Token expired")]
    Expired,
}

impl EmailVerificationToken {
    /// Issue a token for an email; returns the raw token for the email link
    pub async fn issue(
        conn: &mut AsyncPgConnection,
        email_addr: &str,
        ttl_seconds: u64,
    ) -> Result<String, TokenError> {
        let token = Uuid::new_v4().to_string();

        diesel::insert_into(email_verification_tokens::table)
            .values(&NewEmailVerificationToken {
                email: email_addr.to_lowercase(),
                token_hash: crate::models::session::Session::hash_token(&token),
                expires: Utc::now() + Duration::seconds(ttl_seconds as i64),
            })
            .execute(conn)
            .await?;

        Ok(token)
    }

    /// Atomically consume a token: the row is deleted whether the outcome is
    /// success or Expired, so a second concurrent consumer sees Invalid.
    pub async fn consume(
        conn: &mut AsyncPgConnection,
        token: &str,
    ) -> Result<Self, TokenError> {
        use crate::schema::email_verification_tokens::dsl::*;

        let hash = crate::models::session::Session::hash_token(token);
        let row = diesel::delete(email_verification_tokens.filter(token_hash.eq(&hash)))
            .get_result::<EmailVerificationToken>(conn)
            .await
            .optional()?
            .ok_or(TokenError::Invalid)?;

        if row.expires < Utc::now() {
            return Err(TokenError::Expired);
        }

        Ok(row)
    }

    /// Remove every outstanding token for an email. Called after a successful
    /// consumption so a stale sibling token cannot be replayed.
    pub async fn delete_all_for_email(
        conn: &mut AsyncPgConnection,
        email_addr: &str,
    ) -> Result<usize, TokenError> {
        use crate::schema::email_verification_tokens::dsl::*;

        diesel::delete(email_verification_tokens.filter(email.eq(email_addr.to_lowercase())))
            .execute(conn)
            .await
            .map_err(TokenError::Database)
    }
}
