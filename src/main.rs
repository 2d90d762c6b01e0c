use axum::{middleware::from_fn_with_state, routing::get, Router};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use localrank_backend::{
    auth_middleware, auth_routes, business_routes, health_check, initialize_app_state, job_routes,
    keyword_routes, visibility_routes, JobScheduler,
};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "localrank_backend=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = match initialize_app_state().await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            return Err(std::io::Error::other(format!(
                "Startup failed: {}",
                e
            )));
        },
    };

    let config = localrank_backend::config();
    let bind_address = config.bind_address.clone();

    // Routes behind bearer-token authentication
    let protected = Router::new()
        .nest("/v1/keywords", keyword_routes())
        .nest("/v1/visibility", visibility_routes())
        .nest("/v1/businesses", business_routes())
        .nest("/jobs", job_routes())
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    let app = Router::new()
        .route("/health", get(health_check))
        .nest("/v1/auth", auth_routes())
        .merge(protected)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state.clone());

    // Background rank-tracking scheduler
    let mut scheduler = if config.jobs.scheduler_enabled {
        let mut scheduler = JobScheduler::new(
            state.tracking_service.clone(),
            config.jobs.rank_tracking_hour_utc,
        );
        scheduler.start();
        info!(
            "Rank tracking scheduler armed for {:02}:00 UTC",
            config.jobs.rank_tracking_hour_utc
        );
        Some(scheduler)
    } else {
        info!("Rank tracking scheduler disabled by configuration");
        None
    };

    info!("Starting LocalRank backend on {}", bind_address);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(scheduler) = scheduler.as_mut() {
        scheduler.shutdown();
    }
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
