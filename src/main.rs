//! EduCenter - REST backend for an education center directory

use anyhow::Result;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use educenter::{
    api::{self, AppState},
    config::Config,
    db,
};

/// Seconds between maintenance runs
const MAINTENANCE_INTERVAL_SECS: u64 = 300;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "educenter=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting EduCenter...");

    // Load configuration
    let config_path = std::env::var("EDUCENTER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.yml"));
    let config = Config::load_with_env(&config_path)?;
    tracing::info!("Configuration loaded from {}", config_path.display());
    if config.uses_default_secrets() {
        tracing::warn!("Default secrets are in use; set real ones before deploying");
    }

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed ({} applied)", applied);

    tokio::fs::create_dir_all(&config.upload.path).await?;

    // Build application state
    let state = AppState::build(pool.clone(), &config);

    // Maintenance task: rate limiter windows and expired sessions
    {
        let limiter = Arc::clone(&state.rate_limiter);
        let users = Arc::clone(&state.user_service);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(tokio::time::Duration::from_secs(MAINTENANCE_INTERVAL_SECS));
            loop {
                interval.tick().await;
                limiter.cleanup().await;
                match users.cleanup_expired_sessions().await {
                    Ok(0) => {}
                    Ok(removed) => tracing::info!("Removed {} expired sessions", removed),
                    Err(e) => tracing::warn!("Failed to remove expired sessions: {}", e),
                }
            }
        });
    }

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    pool.close().await;
    Ok(())
}
