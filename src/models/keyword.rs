// Keyword tracking model

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::schema::keywords;

/// Keyword lifecycle status. Archiving is the soft-removal path; hard delete
/// also exists for cleanup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum KeywordStatus {
    Active,
    Archived,
}

impl KeywordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeywordStatus::Active => "active",
            KeywordStatus::Archived => "archived",
        }
    }
}

impl FromStr for KeywordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(KeywordStatus::Active),
            "archived" => Ok(KeywordStatus::Archived),
            _ => Err(format!("Invalid keyword status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = keywords)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Keyword {
    pub id: Uuid,
    pub business_id: Uuid,
    pub location_id: Option<Uuid>,
    pub keyword: String,
    pub search_volume: i32,
    pub difficulty: Option<i32>,
    pub tags: Vec<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = keywords)]
pub struct NewKeyword {
    pub business_id: Uuid,
    pub location_id: Option<Uuid>,
    pub keyword: String,
    pub search_volume: i32,
    pub difficulty: Option<i32>,
    pub tags: Vec<String>,
    pub status: String,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = keywords)]
pub struct KeywordUpdate {
    pub keyword: Option<String>,
    pub search_volume: Option<i32>,
    pub difficulty: Option<Option<i32>>,
    pub tags: Option<Vec<String>>,
    pub status: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(thiserror::Error, Debug)]
pub enum KeywordError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Keyword not found")]
    NotFound,
}

impl Keyword {
    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        keyword_id: Uuid,
    ) -> Result<Self, KeywordError> {
        use crate::schema::keywords::dsl::*;

        keywords
            .filter(id.eq(keyword_id))
            .first::<Keyword>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => KeywordError::NotFound,
                _ => KeywordError::Database(e),
            })
    }

    pub async fn create(
        conn: &mut AsyncPgConnection,
        new_keyword: NewKeyword,
    ) -> Result<Self, KeywordError> {
        diesel::insert_into(keywords::table)
            .values(&new_keyword)
            .get_result::<Keyword>(conn)
            .await
            .map_err(KeywordError::Database)
    }

    pub async fn update(
        conn: &mut AsyncPgConnection,
        keyword_id: Uuid,
        update: KeywordUpdate,
    ) -> Result<Self, KeywordError> {
        use crate::schema::keywords::dsl::*;

        diesel::update(keywords.filter(id.eq(keyword_id)))
            .set(&update)
            .get_result::<Keyword>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => KeywordError::NotFound,
                _ => KeywordError::Database(e),
            })
    }

    /// Soft removal via lifecycle status
    pub async fn archive(
        conn: &mut AsyncPgConnection,
        keyword_id: Uuid,
    ) -> Result<Self, KeywordError> {
        Self::update(
            conn,
            keyword_id,
            KeywordUpdate {
                keyword: None,
                search_volume: None,
                difficulty: None,
                tags: None,
                status: Some(KeywordStatus::Archived.as_str().to_string()),
                updated_at: Utc::now(),
            },
        )
        .await
    }

    /// Hard delete; rank history goes with it (FK cascade)
    pub async fn delete(
        conn: &mut AsyncPgConnection,
        keyword_id: Uuid,
    ) -> Result<(), KeywordError> {
        use crate::schema::keywords::dsl::*;

        let deleted = diesel::delete(keywords.filter(id.eq(keyword_id)))
            .execute(conn)
            .await?;

        if deleted == 0 {
            return Err(KeywordError::NotFound);
        }
        Ok(())
    }

    /// All keywords for a business, newest first
    pub async fn list_for_business(
        conn: &mut AsyncPgConnection,
        business: Uuid,
    ) -> Result<Vec<Self>, KeywordError> {
        use crate::schema::keywords::dsl::*;

        keywords
            .filter(business_id.eq(business))
            .order(created_at.desc())
            .load::<Keyword>(conn)
            .await
            .map_err(KeywordError::Database)
    }

    /// Active keywords in scope for aggregation: a business plus an optional
    /// location filter
    pub async fn active_in_scope(
        conn: &mut AsyncPgConnection,
        business: Uuid,
        location: Option<Uuid>,
    ) -> Result<Vec<Self>, KeywordError> {
        use crate::schema::keywords::dsl::*;

        let mut query = keywords
            .filter(business_id.eq(business))
            .filter(status.eq(KeywordStatus::Active.as_str()))
            .into_boxed();

        if let Some(loc) = location {
            query = query.filter(location_id.eq(loc));
        }

        query
            .order(created_at.asc())
            .load::<Keyword>(conn)
            .await
            .map_err(KeywordError::Database)
    }

    pub fn status_enum(&self) -> KeywordStatus {
        KeywordStatus::from_str(&self.status).unwrap_or_else(|e| {
            tracing::warn!(
                "Invalid keyword status '{}' for keyword {}, treating as archived: {}",
                self.status,
                self.id,
                e
            );
            KeywordStatus::Archived
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_conversion() {
        assert_eq!(KeywordStatus::Active.as_str(), "active");
        assert_eq!(KeywordStatus::Archived.as_str(), "archived");
        assert_eq!(
            KeywordStatus::from_str("active"),
            Ok(KeywordStatus::Active)
        );
        assert_eq!(
            KeywordStatus::from_str("archived"),
            Ok(KeywordStatus::Archived)
        );
        assert!(KeywordStatus::from_str("deleted").is_err());
    }
}
