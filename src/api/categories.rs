//! Category API endpoints
//!
//! Resource categories. Public reads, staff writes:
//! - GET /api/v1/categories
//! - GET /api/v1/categories/{id}
//! - POST /api/v1/categories
//! - PATCH /api/v1/categories/{id}
//! - DELETE /api/v1/categories/{id}

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
use crate::api::middleware::{ApiError, AppState};
use crate::models::{Category, CategorySort, PagedResult, UpdateCategoryInput};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 2, max = 55, message = "name must be 2 to 55 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 255, message = "image is required"))]
    pub image: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 2, max = 55, message = "name must be 2 to 55 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255, message = "image must not be empty"))]
    pub image: Option<String>,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/{id}", get(get_category))
}

pub fn staff_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_category))
        .route("/{id}", axum::routing::patch(update_category).delete(delete_category))
}

async fn list_categories(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListQuery>,
) -> Result<Json<PagedResult<Category>>, ApiError> {
    let params = query.to_params::<CategorySort>()?;
    Ok(Json(state.category_service.list(&params).await?))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.category_service.get(id).await?))
}

async fn create_category(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state.category_service.create(&body.name, &body.image).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(body): ValidatedJson<UpdateCategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    let input = UpdateCategoryInput {
        name: body.name,
        image: body.image,
    };
    Ok(Json(state.category_service.update(id, input).await?))
}

async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.category_service.delete(id).await?;
    Ok(Json(MessageResponse::new(format!("Category {} deleted", id))))
}
