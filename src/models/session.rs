// Refresh session model
// Opaque long-lived credential: a random UUID handed to the client, stored
// SHA-256 hashed with an explicit expiry. Deletion is the record of
// consumption; there is no used flag.

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::schema::sessions;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = sessions)]
pub struct NewSession {
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires: DateTime<Utc>,
}

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Session not found")]
    NotFound,

    #[error("Session expired")]
    Expired,
}

impl Session {
    /// Hash an opaque session token for storage/lookup
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Create a session row for a user; returns the raw token to hand to the
    /// client (the database only ever sees the hash)
    pub async fn issue(
        conn: &mut AsyncPgConnection,
        user: Uuid,
        ttl_seconds: u64,
    ) -> Result<String, SessionError> {
        let token = Uuid::new_v4().to_string();

        diesel::insert_into(sessions::table)
            .values(&NewSession {
                user_id: user,
                token_hash: Self::hash_token(&token),
                expires: Utc::now() + Duration::seconds(ttl_seconds as i64),
            })
            .execute(conn)
            .await?;

        Ok(token)
    }

    /// Look up a session by raw token. An expired row is deleted as a side
    /// effect of the check and reported as Expired, never as a valid hit.
    pub async fn find_valid(
        conn: &mut AsyncPgConnection,
        token: &str,
    ) -> Result<Self, SessionError> {
        use crate::schema::sessions::dsl::*;

        let hash = Self::hash_token(token);
        let session = sessions
            .filter(token_hash.eq(&hash))
            .first::<Session>(conn)
            .await
            .optional()?
            .ok_or(SessionError::NotFound)?;

        if session.expires < Utc::now() {
            diesel::delete(sessions.filter(id.eq(session.id)))
                .execute(conn)
                .await?;
            return Err(SessionError::Expired);
        }

        Ok(session)
    }

    /// Revoke a session (logout)
    pub async fn revoke(conn: &mut AsyncPgConnection, token: &str) -> Result<usize, SessionError> {
        use crate::schema::sessions::dsl::*;

        let hash = Self::hash_token(token);
        diesel::delete(sessions.filter(token_hash.eq(&hash)))
            .execute(conn)
            .await
            .map_err(SessionError::Database)
    }

    /// Revoke every session a user holds; used after a password reset
    pub async fn revoke_all_for_user(
        conn: &mut AsyncPgConnection,
        user: Uuid,
    ) -> Result<usize, SessionError> {
        use crate::schema::sessions::dsl::*;

        diesel::delete(sessions.filter(user_id.eq(user)))
            .execute(conn)
            .await
            .map_err(SessionError::Database)
    }

    /// Drop all expired session rows; returns the number deleted
    pub async fn purge_expired(conn: &mut AsyncPgConnection) -> Result<usize, SessionError> {
        use crate::schema::sessions::dsl::*;

        diesel::delete(sessions.filter(expires.lt(Utc::now())))
            .execute(conn)
            .await
            .map_err(SessionError::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_stable_and_hex() {
        let token = "2c4b9dd6-7a1f-4a83-9a56-0f1f4f9a1b2c";
        let h1 = Session::hash_token(token);
        let h2 = Session::hash_token(token);

        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert!(h1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_token_distinguishes_tokens() {
        assert_ne!(Session::hash_token("a"), Session::hash_token("b"));
    }
}
