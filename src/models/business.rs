// Business, location and subscription models

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{businesses, locations, subscriptions, user_business_roles, users};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = businesses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Business {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = businesses)]
pub struct NewBusiness {
    pub name: String,
    pub owner_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = locations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Location {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Subscription {
    pub id: Uuid,
    pub business_id: Uuid,
    pub plan: String,
    pub status: String,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(thiserror::Error, Debug)]
pub enum BusinessError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Business not found")]
    NotFound,
}

impl Business {
    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        business_id: Uuid,
    ) -> Result<Self, BusinessError> {
        use crate::schema::businesses::dsl::*;

        businesses
            .filter(id.eq(business_id))
            .filter(deleted_at.is_null())
            .first::<Business>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => BusinessError::NotFound,
                _ => BusinessError::Database(e),
            })
    }

    /// All non-deleted business ids, the unit of work for the daily jobs
    pub async fn active_ids(conn: &mut AsyncPgConnection) -> Result<Vec<Uuid>, BusinessError> {
        use crate::schema::businesses::dsl::*;

        businesses
            .filter(deleted_at.is_null())
            .select(id)
            .order(created_at.asc())
            .load::<Uuid>(conn)
            .await
            .map_err(BusinessError::Database)
    }

    /// Delete a business and its dependents atomically: subscriptions,
    /// locations and role links are soft-deleted (role links removed), the
    /// owner user is hard-deleted. Any failure rolls the whole cascade back.
    pub async fn delete_cascade(
        conn: &mut AsyncPgConnection,
        business_id: Uuid,
    ) -> Result<(), BusinessError> {
        let business = Self::find_by_id(conn, business_id).await?;

        conn.transaction::<_, diesel::result::Error, _>(|tx| {
            Box::pin(async move {
                let now = Utc::now();

                diesel::update(
                    businesses::table.filter(businesses::id.eq(business_id)),
                )
                .set((
                    businesses::deleted_at.eq(Some(now)),
                    businesses::updated_at.eq(now),
                ))
                .execute(tx)
                .await?;

                diesel::update(
                    subscriptions::table
                        .filter(subscriptions::business_id.eq(business_id))
                        .filter(subscriptions::deleted_at.is_null()),
                )
                .set((
                    subscriptions::deleted_at.eq(Some(now)),
                    subscriptions::updated_at.eq(now),
                ))
                .execute(tx)
                .await?;

                diesel::update(
                    locations::table
                        .filter(locations::business_id.eq(business_id))
                        .filter(locations::deleted_at.is_null()),
                )
                .set((
                    locations::deleted_at.eq(Some(now)),
                    locations::updated_at.eq(now),
                ))
                .execute(tx)
                .await?;

                diesel::delete(
                    user_business_roles::table
                        .filter(user_business_roles::business_id.eq(business_id)),
                )
                .execute(tx)
                .await?;

                diesel::delete(users::table.filter(users::id.eq(business.owner_id)))
                    .execute(tx)
                    .await?;

                Ok(())
            })
        })
        .await
        .map_err(BusinessError::Database)
    }
}

impl Location {
    /// Non-deleted locations of a business
    pub async fn active_for_business(
        conn: &mut AsyncPgConnection,
        business: Uuid,
    ) -> Result<Vec<Self>, BusinessError> {
        use crate::schema::locations::dsl::*;

        locations
            .filter(business_id.eq(business))
            .filter(deleted_at.is_null())
            .order(created_at.asc())
            .load::<Location>(conn)
            .await
            .map_err(BusinessError::Database)
    }
}
