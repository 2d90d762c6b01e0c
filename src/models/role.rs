// RBAC models: roles, permissions and the per-business assignment join

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{permissions, role_permissions, roles, user_business_roles};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = roles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Role {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = permissions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Permission {
    pub id: Uuid,
    pub action: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = user_business_roles)]
pub struct NewUserBusinessRole {
    pub user_id: Uuid,
    pub business_id: Uuid,
    pub role_id: Uuid,
}

#[derive(thiserror::Error, Debug)]
pub enum RoleError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Role not found: {0}")]
    UnknownRole(String),
}

impl Role {
    pub async fn find_by_name(
        conn: &mut AsyncPgConnection,
        role_name: &str,
    ) -> Result<Self, RoleError> {
        use crate::schema::roles::dsl::*;

        roles
            .filter(name.eq(role_name))
            .first::<Role>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => RoleError::UnknownRole(role_name.to_string()),
                _ => RoleError::Database(e),
            })
    }

    /// Assign a role to a user for a business. The (user, business, role)
    /// triple is unique; re-assignment is a no-op.
    pub async fn assign(
        conn: &mut AsyncPgConnection,
        user: Uuid,
        business: Uuid,
        role_name: &str,
    ) -> Result<(), RoleError> {
        let role = Self::find_by_name(conn, role_name).await?;

        diesel::insert_into(user_business_roles::table)
            .values(&NewUserBusinessRole {
                user_id: user,
                business_id: business,
                role_id: role.id,
            })
            .on_conflict_do_nothing()
            .execute(conn)
            .await?;

        Ok(())
    }

    /// (business_id, role_name) pairs for a user across all businesses
    pub async fn assignments_for_user(
        conn: &mut AsyncPgConnection,
        user: Uuid,
    ) -> Result<Vec<(Uuid, String)>, RoleError> {
        user_business_roles::table
            .inner_join(roles::table)
            .filter(user_business_roles::user_id.eq(user))
            .select((user_business_roles::business_id, roles::name))
            .load::<(Uuid, String)>(conn)
            .await
            .map_err(RoleError::Database)
    }

    /// Role names for a user scoped to one business
    pub async fn names_for_user_in_business(
        conn: &mut AsyncPgConnection,
        user: Uuid,
        business: Uuid,
    ) -> Result<Vec<String>, RoleError> {
        user_business_roles::table
            .inner_join(roles::table)
            .filter(user_business_roles::user_id.eq(user))
            .filter(user_business_roles::business_id.eq(business))
            .select(roles::name)
            .load::<String>(conn)
            .await
            .map_err(RoleError::Database)
    }

    /// Permission actions granted to a user for a business, flattened through
    /// every assigned role
    pub async fn permission_actions(
        conn: &mut AsyncPgConnection,
        user: Uuid,
        business: Uuid,
    ) -> Result<Vec<String>, RoleError> {
        user_business_roles::table
            .inner_join(
                role_permissions::table
                    .on(role_permissions::role_id.eq(user_business_roles::role_id)),
            )
            .inner_join(
                permissions::table.on(permissions::id.eq(role_permissions::permission_id)),
            )
            .filter(user_business_roles::user_id.eq(user))
            .filter(user_business_roles::business_id.eq(business))
            .select(permissions::action)
            .distinct()
            .load::<String>(conn)
            .await
            .map_err(RoleError::Database)
    }
}
