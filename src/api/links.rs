//! Center-to-subject and center-to-field link endpoints
//!
//! - GET /api/v1/edu-subjects (filters edu_center_id, subject_id)
//! - GET /api/v1/edu-subjects/{id}
//! - POST /api/v1/edu-subjects `{edu_center_id, subject_id}` - center owner or staff
//! - DELETE /api/v1/edu-subjects/{id} - center owner or staff
//!
//! and the same under /api/v1/edu-fields with `field_id`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::api::common::{ListQuery, MessageResponse};
use crate::api::extract::{ValidQuery, ValidatedJson};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{CatalogKind, EduLink, LinkFilter, LinkSort, PagedResult};
use crate::services::LinkService;

/// Selects which join table a handler instance serves
pub trait LinkRoute: Send + Sync + 'static {
    const KIND: CatalogKind;

    fn service(state: &AppState) -> &Arc<LinkService>;
}

pub struct EduSubjects;
pub struct EduFields;

impl LinkRoute for EduSubjects {
    const KIND: CatalogKind = CatalogKind::Subject;

    fn service(state: &AppState) -> &Arc<LinkService> {
        &state.edu_subject_service
    }
}

impl LinkRoute for EduFields {
    const KIND: CatalogKind = CatalogKind::Field;

    fn service(state: &AppState) -> &Arc<LinkService> {
        &state.edu_field_service
    }
}

/// Body and filter shape; only the id matching the route's kind is read
#[derive(Debug, Default, Deserialize, Validate)]
pub struct LinkFields {
    pub edu_center_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub field_id: Option<i64>,
}

impl LinkFields {
    fn item_id(&self, kind: CatalogKind) -> Option<i64> {
        match kind {
            CatalogKind::Subject => self.subject_id,
            CatalogKind::Field => self.field_id,
        }
    }
}

pub fn public_router<K: LinkRoute>() -> Router<AppState> {
    Router::new()
        .route("/", get(list_links::<K>))
        .route("/{id}", get(get_link::<K>))
}

pub fn protected_router<K: LinkRoute>() -> Router<AppState> {
    Router::new()
        .route("/", post(create_link::<K>))
        .route("/{id}", delete(delete_link::<K>))
}

async fn list_links<K: LinkRoute>(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListQuery>,
    ValidQuery(filter): ValidQuery<LinkFields>,
) -> Result<Json<PagedResult<EduLink>>, ApiError> {
    let params = query.to_params::<LinkSort>()?;
    let filter = LinkFilter {
        edu_center_id: filter.edu_center_id,
        item_id: filter.item_id(K::KIND),
    };
    Ok(Json(K::service(&state).list(&filter, &params).await?))
}

async fn get_link<K: LinkRoute>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<EduLink>, ApiError> {
    Ok(Json(K::service(&state).get(id).await?))
}

async fn create_link<K: LinkRoute>(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ValidatedJson(body): ValidatedJson<LinkFields>,
) -> Result<impl IntoResponse, ApiError> {
    let edu_center_id = body
        .edu_center_id
        .ok_or_else(|| ApiError::validation_error("edu_center_id is required"))?;
    let item_id = body.item_id(K::KIND).ok_or_else(|| {
        ApiError::validation_error(format!("{} is required", K::KIND.id_column()))
    })?;

    let link = K::service(&state)
        .create(&auth.user, edu_center_id, item_id)
        .await?;
    Ok((StatusCode::CREATED, Json(link)))
}

async fn delete_link<K: LinkRoute>(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    K::service(&state).delete(&auth.user, id).await?;
    Ok(Json(MessageResponse::new(format!("Link {} deleted", id))))
}
