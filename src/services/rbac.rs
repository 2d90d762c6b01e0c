// Role-based access control service
// Role names on the hot paths (billing, reviews) short-circuit before the
// permission join; absence of a grant is a plain `false`, never an error.

use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::db::DieselPool;
use crate::models::role::{Role, RoleError};

pub const ROLE_OWNER: &str = "OWNER";
pub const ROLE_MANAGER: &str = "MANAGER";
pub const ROLE_MEMBER: &str = "MEMBER";

pub const PERM_MANAGE_BILLING: &str = "manage_billing";
pub const PERM_MANAGE_REVIEWS: &str = "manage_reviews";
pub const PERM_MANAGE_KEYWORDS: &str = "manage_keywords";
pub const PERM_VIEW_REPORTS: &str = "view_reports";

#[derive(Error, Debug)]
pub enum RbacError {
    #[error("Pool error: {0}")]
    PoolError(String),

    #[error("Role error: {0}")]
    RoleError(#[from] RoleError),
}

pub struct RbacService {
    db_pool: DieselPool,
}

impl RbacService {
    pub fn new(db_pool: DieselPool) -> Self {
        Self { db_pool }
    }

    async fn get_conn(
        &self,
    ) -> Result<
        bb8::PooledConnection<
            '_,
            diesel_async::pooled_connection::AsyncDieselConnectionManager<
                diesel_async::AsyncPgConnection,
            >,
        >,
        RbacError,
    > {
        self.db_pool
            .get()
            .await
            .map_err(|e| RbacError::PoolError(e.to_string()))
    }

    /// All role assignments for a user, grouped by business.
    /// This is what gets embedded in the access token.
    pub async fn get_user_roles(
        &self,
        user_id: Uuid,
    ) -> Result<HashMap<Uuid, Vec<String>>, RbacError> {
        let mut conn = self.get_conn().await?;
        let assignments = Role::assignments_for_user(&mut conn, user_id).await?;

        let mut map: HashMap<Uuid, Vec<String>> = HashMap::new();
        for (business_id, role_name) in assignments {
            map.entry(business_id).or_default().push(role_name);
        }
        Ok(map)
    }

    /// Generic permission check through the role/permission join
    pub async fn has_permission(
        &self,
        user_id: Uuid,
        business_id: Uuid,
        action: &str,
    ) -> Result<bool, RbacError> {
        let mut conn = self.get_conn().await?;
        let actions = Role::permission_actions(&mut conn, user_id, business_id).await?;
        Ok(actions.iter().any(|a| a == action))
    }

    /// Billing is owner-only; the role check avoids the permission join
    /// for the common case.
    pub async fn can_manage_billing(
        &self,
        user_id: Uuid,
        business_id: Uuid,
    ) -> Result<bool, RbacError> {
        let mut conn = self.get_conn().await?;
        let roles = Role::names_for_user_in_business(&mut conn, user_id, business_id).await?;
        if roles.iter().any(|r| r == ROLE_OWNER) {
            return Ok(true);
        }
        drop(conn);
        self.has_permission(user_id, business_id, PERM_MANAGE_BILLING)
            .await
    }

    /// Review management is granted to owners and managers directly
    pub async fn can_manage_reviews(
        &self,
        user_id: Uuid,
        business_id: Uuid,
    ) -> Result<bool, RbacError> {
        let mut conn = self.get_conn().await?;
        let roles = Role::names_for_user_in_business(&mut conn, user_id, business_id).await?;
        if roles.iter().any(|r| r == ROLE_OWNER || r == ROLE_MANAGER) {
            return Ok(true);
        }
        drop(conn);
        self.has_permission(user_id, business_id, PERM_MANAGE_REVIEWS)
            .await
    }
}

/// Check a role map (as embedded in access token claims) for any of the
/// given roles in a business. Used by handlers that authorize from claims
/// without a database round trip.
pub fn claims_have_role(
    roles: &HashMap<Uuid, Vec<String>>,
    business_id: Uuid,
    wanted: &[&str],
) -> bool {
    roles
        .get(&business_id)
        .map(|names| names.iter().any(|n| wanted.contains(&n.as_str())))
        .unwrap_or(false)
}
