// Library exports for the LocalRank backend
// Exposes modules and the app-state initializer for library consumers

pub mod app;
pub mod app_config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use app::AppState;
pub use app_config::{config, AppConfig};
pub use db::{DieselPool, DieselDatabaseConfig};
pub use middleware::auth_middleware;
pub use middleware::AuthenticatedUser;
pub use services::{
    AccessTokenClaims, EmailDispatcher, EmailService, HeatmapService, HttpSerpClient, JobScheduler,
    JwtService, PasswordResetService, RankTrackingService, RbacService, SerpClient,
    VerificationService, VisibilityService,
};

// Re-export handler route builders
pub use handlers::{auth_routes, business_routes, job_routes, keyword_routes, visibility_routes};

/// Initialize the shared application state: config, database pool,
/// embedded migrations, and the service graph.
pub async fn initialize_app_state() -> Result<AppState, Box<dyn std::error::Error>> {
    use std::sync::Arc;
    use tracing::info;

    // Load environment
    dotenv::dotenv().ok();

    // Force config parse early so startup fails fast on a bad environment
    let config = app_config::config();

    // Initialize database pool
    info!("Initializing database pool...");
    let db_config = db::DieselDatabaseConfig::default();
    let max_connections = db_config.max_connections;
    let diesel_pool = db::create_diesel_pool(db_config).await?;

    // Run migrations if enabled
    if migrations::should_run_migrations() {
        info!("Running embedded migrations...");
        migrations::run_pending_migrations()
            .await
            .map_err(|e| format!("Migration failed: {}", e))?;
    }

    // Initialize services
    let jwt_service = Arc::new(JwtService::from_env());
    let rbac_service = Arc::new(RbacService::new(diesel_pool.clone()));

    let email_service = EmailService::new(config.email.clone())?;
    let dispatcher = EmailDispatcher::start(email_service);

    let verification_service = Arc::new(VerificationService::new(
        diesel_pool.clone(),
        dispatcher.clone(),
    ));
    let password_reset_service = Arc::new(PasswordResetService::new(
        diesel_pool.clone(),
        dispatcher,
    ));

    let serp_client: Arc<dyn SerpClient> = Arc::new(HttpSerpClient::from_env()?);
    let tracking_service = Arc::new(RankTrackingService::new(diesel_pool.clone(), serp_client));
    let visibility_service = Arc::new(VisibilityService::new(diesel_pool.clone()));
    let heatmap_service = Arc::new(HeatmapService::new(diesel_pool.clone()));

    Ok(AppState {
        diesel_pool,
        jwt_service,
        rbac_service,
        verification_service,
        password_reset_service,
        tracking_service,
        visibility_service,
        heatmap_service,
        max_connections,
    })
}

// Health check handler
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    use axum::http::StatusCode;
    use axum::Json;

    let mut overall_healthy = true;
    let timestamp = chrono::Utc::now().to_rfc3339();

    let postgres_health = match db::check_diesel_health(&state.diesel_pool).await {
        Ok(_) => serde_json::json!({
            "status": "healthy",
            "max_connections": state.max_connections,
            "error": null
        }),
        Err(e) => {
            overall_healthy = false;
            serde_json::json!({
                "status": "unhealthy",
                "error": format!("Database connection failed: {}", e)
            })
        }
    };

    let response = serde_json::json!({
        "status": if overall_healthy { "healthy" } else { "degraded" },
        "service": "localrank-backend",
        "timestamp": timestamp,
        "components": {
            "postgresql": postgres_health
        }
    });

    if overall_healthy {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
