//! Education center API endpoints
//!
//! - GET /api/v1/edu-centers - List (name prefix search; filters region_id,
//!   subject_id, field_id, user_id)
//! - GET /api/v1/edu-centers/{id} - Center with subjects, fields, branches
//!   and review aggregates
//! - POST /api/v1/edu-centers - ceo or staff
//! - PATCH /api/v1/edu-centers/{id} - Owner or staff
//! - DELETE /api/v1/edu-centers/{id} - Owner or staff

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
use crate::models::{
    EduCenter, EduCenterDetails, EduCenterFilter, EduCenterSort, PagedResult, UpdateEduCenterInput,
};
use crate::services::CreateEduCenterInput;

#[derive(Debug, Default, Deserialize)]
pub struct EduCenterFilterQuery {
    pub region_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub field_id: Option<i64>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEduCenterRequest {
    #[validate(length(min = 2, max = 100, message = "name must be 2 to 100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 255, message = "image is required"))]
    pub image: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(length(min = 1, max = 255, message = "license is required"))]
    pub license: String,
    pub address: Option<String>,
    pub region_id: i64,
    pub user_id: Option<i64>,
    #[serde(default)]
    pub subject_ids: Vec<i64>,
    #[serde(default)]
    pub field_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateEduCenterRequest {
    #[validate(length(min = 2, max = 100, message = "name must be 2 to 100 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255, message = "image must not be empty"))]
    pub image: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 255, message = "license must not be empty"))]
    pub license: Option<String>,
    pub address: Option<String>,
    pub region_id: Option<i64>,
    pub user_id: Option<i64>,
    pub subject_ids: Option<Vec<i64>>,
    pub field_ids: Option<Vec<i64>>,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_centers))
        .route("/{id}", get(get_center))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_center))
        .route("/{id}", axum::routing::patch(update_center).delete(delete_center))
}

async fn list_centers(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListQuery>,
    ValidQuery(filter): ValidQuery<EduCenterFilterQuery>,
) -> Result<Json<PagedResult<EduCenter>>, ApiError> {
    let params = query.to_params::<EduCenterSort>()?;
    let filter = EduCenterFilter {
        region_id: filter.region_id,
        subject_id: filter.subject_id,
        field_id: filter.field_id,
        user_id: filter.user_id,
    };
    Ok(Json(state.edu_center_service.list(&filter, &params).await?))
}

async fn get_center(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<EduCenterDetails>, ApiError> {
    Ok(Json(state.edu_center_service.get_details(id).await?))
}

async fn create_center(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ValidatedJson(body): ValidatedJson<CreateEduCenterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = CreateEduCenterInput {
        name: body.name,
        image: body.image,
        phone: body.phone,
        license: body.license,
        address: body.address,
        region_id: body.region_id,
        user_id: body.user_id,
        subject_ids: body.subject_ids,
        field_ids: body.field_ids,
    };
    let center = state.edu_center_service.create(&auth.user, input).await?;
    Ok((StatusCode::CREATED, Json(center)))
}

async fn update_center(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<i64>,
    ValidatedJson(body): ValidatedJson<UpdateEduCenterRequest>,
) -> Result<Json<EduCenterDetails>, ApiError> {
    let input = UpdateEduCenterInput {
        name: body.name,
        image: body.image,
        phone: body.phone,
        license: body.license,
        address: body.address,
        region_id: body.region_id,
        user_id: body.user_id,
        subject_ids: body.subject_ids,
        field_ids: body.field_ids,
    };
    Ok(Json(state.edu_center_service.update(&auth.user, id, input).await?))
}

async fn delete_center(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.edu_center_service.delete(&auth.user, id).await?;
    Ok(Json(MessageResponse::new(format!("Education center {} deleted", id))))
}
