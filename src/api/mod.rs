//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints for the education center
//! directory. It includes:
//! - Auth endpoints (registration, email verification, tokens, sessions)
//! - User administration
//! - Regions, resource categories and resources
//! - Subjects and fields
//! - Education centers, their subject/field links and branches
//! - Course registrations, comments and likes
//! - Uploads and health
//!
//! Every module exposes up to three routers: public, protected (signed in)
//! and staff. They are merged here under the matching middleware.

pub mod auth;
pub mod branches;
pub mod catalog;
pub mod categories;
pub mod comments;
pub mod common;
pub mod course_registrations;
pub mod edu_centers;
pub mod extract;
pub mod health;
pub mod likes;
pub mod links;
pub mod middleware;
pub mod regions;
pub mod resources;
pub mod upload;
pub mod users;


use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::services::upload::UPLOADS_URL_PREFIX;
use catalog::{Fields, Subjects};
use links::{EduFields, EduSubjects};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Room for multipart framing and text fields next to the largest file
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Staff routes (admin or super-admin)
    let staff_routes = Router::new()
        .nest("/users", users::staff_router())
        .nest("/regions", regions::staff_router())
        .nest("/categories", categories::staff_router())
        .nest("/subjects", catalog::staff_router::<Subjects>())
        .nest("/fields", catalog::staff_router::<Fields>())
        .route_layer(axum_middleware::from_fn(middleware::require_staff))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (any signed-in user; ownership checked by services)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/users", users::protected_router())
        .nest("/resources", resources::protected_router())
        .nest("/edu-centers", edu_centers::protected_router())
        .nest("/edu-subjects", links::protected_router::<EduSubjects>())
        .nest("/edu-fields", links::protected_router::<EduFields>())
        .nest("/branches", branches::protected_router())
        .nest("/course-registrations", course_registrations::protected_router())
        .nest("/comments", comments::protected_router())
        .nest("/likes", likes::protected_router())
        .nest("/upload", upload::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .nest("/auth", auth::public_router())
        .nest("/health", health::router())
        .nest("/regions", regions::public_router())
        .nest("/categories", categories::public_router())
        .nest("/resources", resources::public_router())
        .nest("/subjects", catalog::public_router::<Subjects>())
        .nest("/fields", catalog::public_router::<Fields>())
        .nest("/edu-centers", edu_centers::public_router())
        .nest("/edu-subjects", links::public_router::<EduSubjects>())
        .nest("/edu-fields", links::public_router::<EduFields>())
        .nest("/branches", branches::public_router())
        .nest("/comments", comments::public_router())
        .nest("/likes", likes::public_router())
        .merge(staff_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let body_limit = usize::try_from(state.files.max_file_size())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        // Uploaded files (read-only)
        .nest_service(UPLOADS_URL_PREFIX, ServeDir::new(state.files.root()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(cors_origin))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the configured origin; `*` allows any origin
fn cors_layer(cors_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if cors_origin.trim() == "*" {
        return cors.allow_origin(Any);
    }

    match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!("Invalid CORS origin '{}', cross-origin requests are disabled", cors_origin);
            cors
        }
    }
}
