// Session and one-time-token lifecycle tests against a live database.
// Each test is a no-op unless DATABASE_URL points at a reachable Postgres.

use localrank_backend::app_config::EmailConfig;
use localrank_backend::db::{create_diesel_pool, DieselDatabaseConfig, DieselPool};
use localrank_backend::models::{
    EmailVerificationToken, NewUser, PasswordResetToken, Session, SessionError, TokenError, User,
    UserError,
};
use localrank_backend::services::email::{EmailDispatcher, EmailService};
use localrank_backend::services::password_reset::{PasswordResetError, PasswordResetService};
use localrank_backend::services::verification::{VerificationError, VerificationService};
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

async fn create_test_user(pool: &DieselPool) -> User {
    let mut conn = pool.get().await.expect("Failed to get connection");
    let email = format!("it-{}@example.com", Uuid::new_v4());
    User::create(
        &mut conn,
        NewUser {
            email,
            password_hash: hash_password("Sup3rSecret!pw").expect("hash"),
            full_name: "Integration Test".to_string(),
        },
    )
    .await
    .expect("Failed to create test user")
}

#[tokio::test]
async fn test_session_issue_and_lookup() {
    let Some(pool) = test_pool().await else { return };
    let user = create_test_user(&pool).await;
    let mut conn = pool.get().await.expect("Failed to get connection");

    let token = Session::issue(&mut conn, user.id, 3600)
        .await
        .expect("Failed to issue session");

    let session = Session::find_valid(&mut conn, &token)
        .await
        .expect("Fresh session must be valid");
    assert_eq!(session.user_id, user.id);

    // Raw token never hits the table
    assert_ne!(session.token_hash, token);
    assert_eq!(session.token_hash, Session::hash_token(&token));
}

#[tokio::test]
async fn test_revoked_session_is_gone() {
    let Some(pool) = test_pool().await else { return };
    let user = create_test_user(&pool).await;
    let mut conn = pool.get().await.expect("Failed to get connection");

    let token = Session::issue(&mut conn, user.id, 3600)
        .await
        .expect("Failed to issue session");

    let deleted = Session::revoke(&mut conn, &token)
        .await
        .expect("Failed to revoke");
    assert_eq!(deleted, 1);

    assert!(matches!(
        Session::find_valid(&mut conn, &token).await,
        Err(SessionError::NotFound)
    ));
}

#[tokio::test]
async fn test_expired_session_reported_and_reaped() {
    let Some(pool) = test_pool().await else { return };
    let user = create_test_user(&pool).await;
    let mut conn = pool.get().await.expect("Failed to get connection");

    let token = Session::issue(&mut conn, user.id, 0)
        .await
        .expect("Failed to issue session");

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    assert!(matches!(
        Session::find_valid(&mut conn, &token).await,
        Err(SessionError::Expired)
    ));

    // The expired row was deleted by the failed check
    assert!(matches!(
        Session::find_valid(&mut conn, &token).await,
        Err(SessionError::NotFound)
    ));
}

#[tokio::test]
async fn test_revoke_all_sessions_for_user() {
    let Some(pool) = test_pool().await else { return };
    let user = create_test_user(&pool).await;
    let mut conn = pool.get().await.expect("Failed to get connection");

    let first = Session::issue(&mut conn, user.id, 3600).await.expect("issue");
    let second = Session::issue(&mut conn, user.id, 3600).await.expect("issue");

    let deleted = Session::revoke_all_for_user(&mut conn, user.id)
        .await
        .expect("Failed to revoke all");
    assert_eq!(deleted, 2);

    assert!(Session::find_valid(&mut conn, &first).await.is_err());
    assert!(Session::find_valid(&mut conn, &second).await.is_err());
}

#[tokio::test]
async fn test_verification_token_is_single_use() {
    let Some(pool) = test_pool().await else { return };
    let mut conn = pool.get().await.expect("Failed to get connection");

    let email = format!("it-{}@example.com", Uuid::new_v4());
    let token = EmailVerificationToken::issue(&mut conn, &email, 3600)
        .await
        .expect("Failed to issue token");

    let consumed = EmailVerificationToken::consume(&mut conn, &token)
        .await
        .expect("First consume must succeed");
    assert_eq!(consumed.email, email);

    assert!(matches!(
        EmailVerificationToken::consume(&mut conn, &token).await,
        Err(TokenError::Invalid)
    ));
}

#[tokio::test]
async fn test_expired_verification_token_rejected() {
    let Some(pool) = test_pool().await else { return };
    let mut conn = pool.get().await.expect("Failed to get connection");

    let email = format!("it-{}@example.com", Uuid::new_v4());
    let token = EmailVerificationToken::issue(&mut conn, &email, 0)
        .await
        .expect("Failed to issue token");

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    assert!(matches!(
        EmailVerificationToken::consume(&mut conn, &token).await,
        Err(TokenError::Expired)
    ));
}

/// Dispatcher wired to an unreachable provider; the flows under test never
/// enqueue anything, the services just need one to construct.
fn test_dispatcher() -> EmailDispatcher {
    let service = EmailService::new(EmailConfig {
        api_key: "test-key".to_string(),
        api_url: "http://127.0.0.1:9/send".to_string(),
        from_email: "noreply@example.com".to_string(),
        from_name: "LocalRank".to_string(),
        dashboard_url: "http://localhost:3000".to_string(),
    })
    .expect("Failed to build email service");
    EmailDispatcher::start(service)
}

#[tokio::test]
async fn test_expired_reset_token_deleted_by_failed_service_check() {
    let Some(pool) = test_pool().await else { return };
    let user = create_test_user(&pool).await;
    let service = PasswordResetService::new(pool.clone(), test_dispatcher());

    let info = PasswordResetToken::generate(0);
    let raw = info.token.clone();
    {
        let mut conn = pool.get().await.expect("Failed to get connection");
        PasswordResetToken::store(&mut conn, &user.email, &info)
            .await
            .expect("Failed to store token");
    }
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    assert!(matches!(
        service.reset_password(&raw, "Fresh9password").await,
        Err(PasswordResetError::TokenExpired)
    ));

    // The failed check already deleted the row; a retry must find nothing
    // rather than report expired again
    assert!(matches!(
        service.reset_password(&raw, "Fresh9password").await,
        Err(PasswordResetError::InvalidToken)
    ));
}

#[tokio::test]
async fn test_expired_verification_token_deleted_by_failed_service_check() {
    let Some(pool) = test_pool().await else { return };
    let user = create_test_user(&pool).await;
    let service = VerificationService::new(pool.clone(), test_dispatcher());

    let raw = {
        let mut conn = pool.get().await.expect("Failed to get connection");
        EmailVerificationToken::issue(&mut conn, &user.email, 0)
            .await
            .expect("Failed to issue token")
    };
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    assert!(matches!(
        service.verify_email(&raw).await,
        Err(VerificationError::TokenExpired)
    ));

    // Row gone after the rejection, not restored by a rollback
    assert!(matches!(
        service.verify_email(&raw).await,
        Err(VerificationError::InvalidToken)
    ));
}

#[tokio::test]
async fn test_verify_email_marks_user_verified() {
    let Some(pool) = test_pool().await else { return };
    let user = create_test_user(&pool).await;
    let service = VerificationService::new(pool.clone(), test_dispatcher());

    let raw = {
        let mut conn = pool.get().await.expect("Failed to get connection");
        EmailVerificationToken::issue(&mut conn, &user.email, 3600)
            .await
            .expect("Failed to issue token")
    };

    let email = service.verify_email(&raw).await.expect("Verification must succeed");
    assert_eq!(email, user.email);

    let mut conn = pool.get().await.expect("Failed to get connection");
    let reloaded = User::find_by_email(&mut conn, &user.email)
        .await
        .expect("Failed to reload user");
    assert!(reloaded.is_verified());
}

#[tokio::test]
async fn test_duplicate_email_registration_rejected() {
    let Some(pool) = test_pool().await else { return };
    let mut conn = pool.get().await.expect("Failed to get connection");
    let email = format!("it-{}@example.com", Uuid::new_v4());

    User::create(
        &mut conn,
        NewUser {
            email: email.clone(),
            password_hash: hash_password("Sup3rSecret!pw").expect("hash"),
            full_name: "First Registrant".to_string(),
        },
    )
    .await
    .expect("First registration must succeed");

    let second = User::create(
        &mut conn,
        NewUser {
            email,
            password_hash: hash_password("0therSecret!pw").expect("hash"),
            full_name: "Second Registrant".to_string(),
        },
    )
    .await;

    assert!(matches!(second, Err(UserError::AlreadyExists)));
}
