//! Like API endpoints
//!
//! - GET /api/v1/likes (filters user_id, edu_center_id)
//! - GET /api/v1/likes/{id}
//! - POST /api/v1/likes `{edu_center_id}` - once per user and center
//! - DELETE /api/v1/likes/{id} - Owner or staff

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::common::{ListQuery, MessageResponse};
use crate::api::extract::{ValidQuery, ValidatedJson};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Like, LikeFilter, LikeSort, PagedResult};

#[derive(Debug, Default, Deserialize)]
pub struct LikeFilterQuery {
    pub user_id: Option<i64>,
    pub edu_center_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LikeRequest {
    pub edu_center_id: i64,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_likes))
        .route("/{id}", get(get_like))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", post(like))
        .route("/{id}", delete(unlike))
}

async fn list_likes(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListQuery>,
    ValidQuery(filter): ValidQuery<LikeFilterQuery>,
) -> Result<Json<PagedResult<Like>>, ApiError> {
    let params = query.to_params::<LikeSort>()?;
    let filter = LikeFilter {
        user_id: filter.user_id,
        edu_center_id: filter.edu_center_id,
    };
    Ok(Json(state.like_service.list(&filter, &params).await?))
}

async fn get_like(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Like>, ApiError> {
    Ok(Json(state.like_service.get(id).await?))
}

async fn like(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ValidatedJson(req): ValidatedJson<LikeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let like = state.like_service.create(&auth.user, req.edu_center_id).await?;
    Ok((StatusCode::CREATED, Json(like)))
}

async fn unlike(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.like_service.delete(&auth.user, id).await?;
    Ok(Json(MessageResponse::new(format!("Like {} deleted", id))))
}
