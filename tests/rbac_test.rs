// RBAC tests against the seeded role/permission vocabulary.
// Each test is a no-op unless DATABASE_URL points at a reachable Postgres.

use diesel_async::RunQueryDsl;
use localrank_backend::db::{create_diesel_pool, DieselDatabaseConfig, DieselPool};
use localrank_backend::models::{Business, NewBusiness, NewUser, Role, User};
use localrank_backend::services::rbac::{
    RbacService, PERM_MANAGE_BILLING, PERM_MANAGE_KEYWORDS, PERM_VIEW_REPORTS, ROLE_MANAGER,
    ROLE_MEMBER, ROLE_OWNER,
};
use localrank_backend::utils::password::hash_password;
use uuid::Uuid;

async fn test_pool() -> Option<DieselPool> {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set, skipping database test");
        return None;
    }
    dotenv::dotenv().ok();
    create_diesel_pool(DieselDatabaseConfig::default()).await.ok()
}

async fn seed_user_and_business(pool: &DieselPool) -> (User, Business) {
    use localrank_backend::schema::businesses;

    let mut conn = pool.get().await.expect("Failed to get connection");

    let user = User::create(
        &mut conn,
        NewUser {
            email: format!("rbac-{}@example.com", Uuid::new_v4()),
            password_hash: hash_password("Sup3rSecret!pw").expect("hash"),
            full_name: "RBAC Test".to_string(),
        },
    )
    .await
    .expect("Failed to create user");

    let business: Business = diesel::insert_into(businesses::table)
        .values(&NewBusiness {
            name: format!("Test Plumbing {}", Uuid::new_v4()),
            owner_id: user.id,
        })
        .get_result(&mut conn)
        .await
        .expect("Failed to create business");

    (user, business)
}

#[tokio::test]
async fn test_owner_role_map_and_permissions() {
    let Some(pool) = test_pool().await else { return };
    let (user, business) = seed_user_and_business(&pool).await;

    {
        let mut conn = pool.get().await.expect("Failed to get connection");
        Role::assign(&mut conn, user.id, business.id, ROLE_OWNER)
            .await
            .expect("Failed to assign role");
    }

    let rbac = RbacService::new(pool.clone());

    let roles = rbac.get_user_roles(user.id).await.expect("get_user_roles");
    assert_eq!(roles.get(&business.id), Some(&vec![ROLE_OWNER.to_string()]));

    assert!(rbac
        .has_permission(user.id, business.id, PERM_MANAGE_KEYWORDS)
        .await
        .expect("has_permission"));
    assert!(rbac
        .can_manage_billing(user.id, business.id)
        .await
        .expect("can_manage_billing"));
    assert!(rbac
        .can_manage_reviews(user.id, business.id)
        .await
        .expect("can_manage_reviews"));
}

#[tokio::test]
async fn test_manager_can_manage_reviews_but_not_billing() {
    let Some(pool) = test_pool().await else { return };
    let (user, business) = seed_user_and_business(&pool).await;

    {
        let mut conn = pool.get().await.expect("Failed to get connection");
        Role::assign(&mut conn, user.id, business.id, ROLE_MANAGER)
            .await
            .expect("Failed to assign role");
    }

    let rbac = RbacService::new(pool.clone());

    assert!(rbac
        .can_manage_reviews(user.id, business.id)
        .await
        .expect("can_manage_reviews"));
    assert!(
        !rbac
            .can_manage_billing(user.id, business.id)
            .await
            .expect("can_manage_billing"),
        "The fast path and the permission join must agree: no billing for managers"
    );
}

#[tokio::test]
async fn test_member_limited_to_report_viewing() {
    let Some(pool) = test_pool().await else { return };
    let (user, business) = seed_user_and_business(&pool).await;

    {
        let mut conn = pool.get().await.expect("Failed to get connection");
        Role::assign(&mut conn, user.id, business.id, ROLE_MEMBER)
            .await
            .expect("Failed to assign role");
    }

    let rbac = RbacService::new(pool.clone());

    assert!(rbac
        .has_permission(user.id, business.id, PERM_VIEW_REPORTS)
        .await
        .expect("has_permission"));
    assert!(!rbac
        .has_permission(user.id, business.id, PERM_MANAGE_KEYWORDS)
        .await
        .expect("has_permission"));
    assert!(!rbac
        .can_manage_reviews(user.id, business.id)
        .await
        .expect("can_manage_reviews"));
}

#[tokio::test]
async fn test_no_grant_means_false_not_error() {
    let Some(pool) = test_pool().await else { return };
    let (user, business) = seed_user_and_business(&pool).await;

    // No role assigned at all
    let rbac = RbacService::new(pool.clone());

    let roles = rbac.get_user_roles(user.id).await.expect("get_user_roles");
    assert!(roles.is_empty());

    assert!(!rbac
        .has_permission(user.id, business.id, PERM_MANAGE_BILLING)
        .await
        .expect("Absence of a grant is false, not an error"));
}

#[tokio::test]
async fn test_role_assignment_is_idempotent() {
    let Some(pool) = test_pool().await else { return };
    let (user, business) = seed_user_and_business(&pool).await;

    let mut conn = pool.get().await.expect("Failed to get connection");
    Role::assign(&mut conn, user.id, business.id, ROLE_OWNER)
        .await
        .expect("First assignment");
    Role::assign(&mut conn, user.id, business.id, ROLE_OWNER)
        .await
        .expect("Re-assignment must be a no-op");

    let rbac = RbacService::new(pool.clone());
    let roles = rbac.get_user_roles(user.id).await.expect("get_user_roles");
    assert_eq!(
        roles.get(&business.id),
        Some(&vec![ROLE_OWNER.to_string()]),
        "Duplicate assignment must not duplicate the role"
    );
}
