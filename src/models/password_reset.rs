// Password reset token model
// Same lifecycle as verification tokens but with a 1h expiry and a
// base64url random value rather than a UUID.

use base64::prelude::*;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::schema::password_reset_tokens;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = password_reset_tokens)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub email: String,
    pub token_hash: String,
    pub expires: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = password_reset_tokens)]
pub struct NewPasswordResetToken {
    pub email: String,
    pub token_hash: String,
    pub expires: DateTime<Utc>,
}

/// Raw token plus the hash that actually gets stored
#[derive(Debug)]
pub struct ResetTokenInfo {
    pub token: String,
    pub token_hash: String,
    pub expires: DateTime<Utc>,
}

impl PasswordResetToken {
    /// Generate a cryptographically secure reset token (256 bits of entropy,
    /// base64url for safe URL transmission)
    pub fn generate(ttl_seconds: u64) -> ResetTokenInfo {
        let mut token_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut token_bytes);

        let token = BASE64_URL_SAFE_NO_PAD.encode(token_bytes);

        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        let token_hash = format!("{:x}", hasher.finalize());

        ResetTokenInfo {
            token,
            token_hash,
            expires: Utc::now() + Duration::seconds(ttl_seconds as i64),
        }
    }

    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub async fn store(
        conn: &mut AsyncPgConnection,
        email_addr: &str,
        info: &ResetTokenInfo,
    ) -> Result<(), diesel::result::Error> {
        diesel::insert_into(password_reset_tokens::table)
            .values(&NewPasswordResetToken {
                email: email_addr.to_lowercase(),
                token_hash: info.token_hash.clone(),
                expires: info.expires,
            })
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Atomically consume a reset token via DELETE .. RETURNING; expiry is
    /// judged on the returned row, which is already gone either way.
    pub async fn consume(
        conn: &mut AsyncPgConnection,
        token: &str,
    ) -> Result<Self, super::verification_token::TokenError> {
        use crate::schema::password_reset_tokens::dsl::*;
        use super::verification_token::TokenError;

        let hash = Self::hash_token(token);
        let row = diesel::delete(password_reset_tokens.filter(token_hash.eq(&hash)))
            .get_result::<PasswordResetToken>(conn)
            .await
            .optional()?
            .ok_or(TokenError::Invalid)?;

        if row.expires < Utc::now() {
            return Err(TokenError::Expired);
        }

        Ok(row)
    }

    /// Drop any earlier outstanding tokens for an email before issuing a new
    /// one, preventing token accumulation
    pub async fn delete_all_for_email(
        conn: &mut AsyncPgConnection,
        email_addr: &str,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::password_reset_tokens::dsl::*;

        diesel::delete(password_reset_tokens.filter(email.eq(email_addr.to_lowercase())))
            .execute(conn)
            .await
    }
}
