//! Resource API endpoints
//!
//! - GET /api/v1/resources - List (filters: category_id, user_id)
//! - GET /api/v1/resources/{id}
//! - POST /api/v1/resources - Any signed-in user
//! - PATCH /api/v1/resources/{id} - Author or staff
//! - DELETE /api/v1/resources/{id} - Author or staff

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
use crate::models::{PagedResult, Resource, ResourceFilter, ResourceSort, UpdateResourceInput};
use crate::services::CreateResourceInput;

#[derive(Debug, Default, Deserialize)]
pub struct ResourceFilterQuery {
    pub category_id: Option<i64>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateResourceRequest {
    #[validate(length(min = 2, max = 100, message = "name must be 2 to 100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 255, message = "media is required"))]
    pub media: String,
    #[serde(default)]
    pub description: String,
    pub category_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateResourceRequest {
    #[validate(length(min = 2, max = 100, message = "name must be 2 to 100 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255, message = "media must not be empty"))]
    pub media: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_resources))
        .route("/{id}", get(get_resource))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_resource))
        .route("/{id}", axum::routing::patch(update_resource).delete(delete_resource))
}

async fn list_resources(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListQuery>,
    ValidQuery(filter): ValidQuery<ResourceFilterQuery>,
) -> Result<Json<PagedResult<Resource>>, ApiError> {
    let params = query.to_params::<ResourceSort>()?;
    let filter = ResourceFilter {
        category_id: filter.category_id,
        user_id: filter.user_id,
    };
    Ok(Json(state.resource_service.list(&filter, &params).await?))
}

async fn get_resource(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Resource>, ApiError> {
    Ok(Json(state.resource_service.get(id).await?))
}

async fn create_resource(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ValidatedJson(body): ValidatedJson<CreateResourceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = CreateResourceInput {
        name: body.name,
        media: body.media,
        description: body.description,
        category_id: body.category_id,
    };
    let resource = state.resource_service.create(&auth.user, input).await?;
    Ok((StatusCode::CREATED, Json(resource)))
}

async fn update_resource(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<i64>,
    ValidatedJson(body): ValidatedJson<UpdateResourceRequest>,
) -> Result<Json<Resource>, ApiError> {
    let input = UpdateResourceInput {
        name: body.name,
        media: body.media,
        description: body.description,
        category_id: body.category_id,
    };
    Ok(Json(state.resource_service.update(&auth.user, id, input).await?))
}

async fn delete_resource(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.resource_service.delete(&auth.user, id).await?;
    Ok(Json(MessageResponse::new(format!("Resource {} deleted", id))))
}
