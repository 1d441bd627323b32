//! Region API endpoints
//!
//! Public reads, staff writes:
//! - GET /api/v1/regions
//! - GET /api/v1/regions/{id}
//! - POST /api/v1/regions
//! - PATCH /api/v1/regions/{id}
//! - DELETE /api/v1/regions/{id}

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
use crate::models::{PagedResult, Region, RegionSort};

#[derive(Debug, Deserialize, Validate)]
pub struct RegionRequest {
    #[validate(length(min = 2, max = 55, message = "name must be 2 to 55 characters"))]
    pub name: String,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_regions))
        .route("/{id}", get(get_region))
}

pub fn staff_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_region))
        .route("/{id}", axum::routing::patch(update_region).delete(delete_region))
}

async fn list_regions(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListQuery>,
) -> Result<Json<PagedResult<Region>>, ApiError> {
    let params = query.to_params::<RegionSort>()?;
    Ok(Json(state.region_service.list(&params).await?))
}

async fn get_region(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Region>, ApiError> {
    Ok(Json(state.region_service.get(id).await?))
}

async fn create_region(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RegionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let region = state.region_service.create(&body.name).await?;
    Ok((StatusCode::CREATED, Json(region)))
}

async fn update_region(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(body): ValidatedJson<RegionRequest>,
) -> Result<Json<Region>, ApiError> {
    Ok(Json(state.region_service.update(id, &body.name).await?))
}

async fn delete_region(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.region_service.delete(id).await?;
    Ok(Json(MessageResponse::new(format!("Region {} deleted", id))))
}
