//! Branch API endpoints
//!
//! - GET /api/v1/branches (filters edu_center_id, region_id)
//! - GET /api/v1/branches/{id} - Branch with its subjects and fields
//! - POST /api/v1/branches - Center owner or staff
//! - PATCH /api/v1/branches/{id} - Center owner or staff
//! - DELETE /api/v1/branches/{id} - Center owner or staff

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::common::{validate_phone, ListQuery, MessageResponse};
use crate::api::extract::{ValidQuery, ValidatedJson};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Branch, BranchDetails, BranchFilter, BranchSort, PagedResult, UpdateBranchInput};
use crate::services::CreateBranchInput;

#[derive(Debug, Default, Deserialize)]
pub struct BranchFilterQuery {
    pub edu_center_id: Option<i64>,
    pub region_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBranchRequest {
    #[validate(length(min = 2, max = 100, message = "name must be 2 to 100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 255, message = "image is required"))]
    pub image: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(length(min = 2, max = 255, message = "location must be 2 to 255 characters"))]
    pub location: String,
    pub region_id: i64,
    pub edu_center_id: i64,
    #[serde(default)]
    pub subject_ids: Vec<i64>,
    #[serde(default)]
    pub field_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBranchRequest {
    #[validate(length(min = 2, max = 100, message = "name must be 2 to 100 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255, message = "image must not be empty"))]
    pub image: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    #[validate(length(min = 2, max = 255, message = "location must be 2 to 255 characters"))]
    pub location: Option<String>,
    pub region_id: Option<i64>,
    pub subject_ids: Option<Vec<i64>>,
    pub field_ids: Option<Vec<i64>>,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_branches))
        .route("/{id}", get(get_branch))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_branch))
        .route("/{id}", axum::routing::patch(update_branch).delete(delete_branch))
}

async fn list_branches(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListQuery>,
    ValidQuery(filter): ValidQuery<BranchFilterQuery>,
) -> Result<Json<PagedResult<Branch>>, ApiError> {
    let params = query.to_params::<BranchSort>()?;
    let filter = BranchFilter {
        edu_center_id: filter.edu_center_id,
        region_id: filter.region_id,
    };
    Ok(Json(state.branch_service.list(&filter, &params).await?))
}

async fn get_branch(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BranchDetails>, ApiError> {
    Ok(Json(state.branch_service.get_details(id).await?))
}

async fn create_branch(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ValidatedJson(body): ValidatedJson<CreateBranchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = CreateBranchInput {
        name: body.name,
        image: body.image,
        phone: body.phone,
        location: body.location,
        region_id: body.region_id,
        edu_center_id: body.edu_center_id,
        subject_ids: body.subject_ids,
        field_ids: body.field_ids,
    };
    let branch = state.branch_service.create(&auth.user, input).await?;
    Ok((StatusCode::CREATED, Json(branch)))
}

async fn update_branch(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<i64>,
    ValidatedJson(body): ValidatedJson<UpdateBranchRequest>,
) -> Result<Json<BranchDetails>, ApiError> {
    let input = UpdateBranchInput {
        name: body.name,
        image: body.image,
        phone: body.phone,
        location: body.location,
        region_id: body.region_id,
        subject_ids: body.subject_ids,
        field_ids: body.field_ids,
    };
    Ok(Json(state.branch_service.update(&auth.user, id, input).await?))
}

async fn delete_branch(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.branch_service.delete(&auth.user, id).await?;
    Ok(Json(MessageResponse::new(format!("Branch {} deleted", id))))
}
