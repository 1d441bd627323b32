//! Health endpoint
//!
//! - GET /api/v1/health - Pings the database

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::api::middleware::AppState;
use crate::config::DatabaseDriver;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: DatabaseDriver,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.pool.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                version: env!("CARGO_PKG_VERSION"),
                database: state.pool.driver(),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {:#}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy",
                    version: env!("CARGO_PKG_VERSION"),
                    database: state.pool.driver(),
                    error: Some("database unreachable".to_string()),
                }),
            )
        }
    }
}
