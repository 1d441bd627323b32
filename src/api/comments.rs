//! Comment API endpoints
//!
//! Reviews of education centers:
//! - GET /api/v1/comments (filters edu_center_id, user_id, star)
//! - GET /api/v1/comments/{id}
//! - POST /api/v1/comments `{edu_center_id, comment, star}`
//! - PATCH /api/v1/comments/{id} - Author only
//! - DELETE /api/v1/comments/{id} - Author or staff

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::common::{ListQuery, MessageResponse};
use crate::api::extract::{ValidQuery, ValidatedJson};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Comment, CommentFilter, CommentSort, PagedResult, UpdateCommentInput};

#[derive(Debug, Default, Deserialize)]
pub struct CommentFilterQuery {
    pub edu_center_id: Option<i64>,
    pub user_id: Option<i64>,
    pub star: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    pub edu_center_id: i64,
    #[validate(length(min = 2, max = 250, message = "comment must be 2 to 250 characters"))]
    pub comment: String,
    #[validate(range(min = 0, max = 5, message = "star must be between 0 and 5"))]
    pub star: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 2, max = 250, message = "comment must be 2 to 250 characters"))]
    pub comment: Option<String>,
    #[validate(range(min = 0, max = 5, message = "star must be between 0 and 5"))]
    pub star: Option<i32>,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_comments))
        .route("/{id}", get(get_comment))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_comment))
        .route("/{id}", axum::routing::patch(update_comment).delete(delete_comment))
}

async fn list_comments(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListQuery>,
    ValidQuery(filter): ValidQuery<CommentFilterQuery>,
) -> Result<Json<PagedResult<Comment>>, ApiError> {
    let params = query.to_params::<CommentSort>()?;
    let filter = CommentFilter {
        edu_center_id: filter.edu_center_id,
        user_id: filter.user_id,
        star: filter.star,
    };
    Ok(Json(state.comment_service.list(&filter, &params).await?))
}

async fn get_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Comment>, ApiError> {
    Ok(Json(state.comment_service.get(id).await?))
}

async fn create_comment(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ValidatedJson(req): ValidatedJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .comment_service
        .create(&auth.user, req.edu_center_id, &req.comment, req.star)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn update_comment(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateCommentRequest>,
) -> Result<Json<Comment>, ApiError> {
    let input = UpdateCommentInput {
        comment: req.comment,
        star: req.star,
    };
    Ok(Json(state.comment_service.update(&auth.user, id, input).await?))
}

async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.comment_service.delete(&auth.user, id).await?;
    Ok(Json(MessageResponse::new(format!("Comment {} deleted", id))))
}
