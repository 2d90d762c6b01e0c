// User database model

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::users;

/// User database model - queryable from database
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub is_active: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New user for insertion
#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
}

/// Errors for user operations
#[derive(thiserror::Error, Debug)]
pub enum UserError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("User not found")]
    NotFound,

    #[error("User already exists")]
    AlreadyExists,
}

impl User {
    /// Find user by ID
    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
    ) -> Result<Self, UserError> {
        use crate::schema::users::dsl::*;

        users
            .filter(id.eq(user_id))
            .first::<User>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => UserError::NotFound,
                _ => UserError::Database(e),
            })
    }

    /// Find user by email (case-insensitive)
    pub async fn find_by_email(
        conn: &mut AsyncPgConnection,
        email_str: &str,
    ) -> Result<Self, UserError> {
        use crate::schema::users::dsl::*;
        use diesel::PgTextExpressionMethods;

        users
            .filter(email.ilike(email_str))
            .first::<User>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => UserError::NotFound,
                _ => UserError::Database(e),
            })
    }

    /// Create a new user; a unique-violation on email maps to AlreadyExists
    pub async fn create(
        conn: &mut AsyncPgConnection,
        new_user: NewUser,
    ) -> Result<Self, UserError> {
        use crate::schema::users::dsl::*;

        diesel::insert_into(users)
            .values(&new_user)
            .get_result::<User>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                ) => UserError::AlreadyExists,
                _ => UserError::Database(e),
            })
    }

    /// Stamp the email as verified
    pub async fn mark_email_verified(
        conn: &mut AsyncPgConnection,
        email_str: &str,
    ) -> Result<usize, UserError> {
        use crate::schema::users::dsl::*;
        use diesel::PgTextExpressionMethods;

        diesel::update(users.filter(email.ilike(email_str)))
            .set((
                email_verified_at.eq(Some(Utc::now())),
                updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .await
            .map_err(UserError::Database)
    }

    /// Replace the stored password hash
    pub async fn update_password(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
        new_hash: &str,
    ) -> Result<(), UserError> {
        use crate::schema::users::dsl::*;

        let updated = diesel::update(users.filter(id.eq(user_id)))
            .set((password_hash.eq(new_hash), updated_at.eq(Utc::now())))
            .execute(conn)
            .await
            .map_err(UserError::Database)?;

        if updated == 0 {
            return Err(UserError::NotFound);
        }
        Ok(())
    }

    /// Whether the user may log in
    pub fn is_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }
}
