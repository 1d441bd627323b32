//! Subject and field API endpoints
//!
//! Both catalogs share one set of handlers, instantiated per kind:
//! - GET /api/v1/subjects, GET /api/v1/subjects/{id}
//! - POST /api/v1/subjects - staff, multipart `name` + `image`
//! - PATCH /api/v1/subjects/{id} - staff, multipart, both parts optional
//! - DELETE /api/v1/subjects/{id} - staff
//!
//! and the same under /api/v1/fields.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use crate::api::common::{ListQuery, MessageResponse};
use crate::api::extract::ValidQuery;
use crate::api::middleware::{ApiError, AppState};
use crate::api::upload::{read_form, FormData};
use crate::models::{CatalogItem, CatalogKind, CatalogSort, PagedResult, UpdateCatalogInput};
use crate::services::CatalogService;

/// Selects which catalog a handler instance serves
pub trait CatalogRoute: Send + Sync + 'static {
    const KIND: CatalogKind;

    fn service(state: &AppState) -> &Arc<CatalogService>;
}

pub struct Subjects;
pub struct Fields;

impl CatalogRoute for Subjects {
    const KIND: CatalogKind = CatalogKind::Subject;

    fn service(state: &AppState) -> &Arc<CatalogService> {
        &state.subject_service
    }
}

impl CatalogRoute for Fields {
    const KIND: CatalogKind = CatalogKind::Field;

    fn service(state: &AppState) -> &Arc<CatalogService> {
        &state.field_service
    }
}

pub fn public_router<K: CatalogRoute>() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items::<K>))
        .route("/{id}", get(get_item::<K>))
}

pub fn staff_router<K: CatalogRoute>() -> Router<AppState> {
    Router::new()
        .route("/", post(create_item::<K>))
        .route("/{id}", axum::routing::patch(update_item::<K>).delete(delete_item::<K>))
}

async fn list_items<K: CatalogRoute>(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListQuery>,
) -> Result<Json<PagedResult<CatalogItem>>, ApiError> {
    let params = query.to_params::<CatalogSort>()?;
    Ok(Json(K::service(&state).list(&params).await?))
}

async fn get_item<K: CatalogRoute>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CatalogItem>, ApiError> {
    Ok(Json(K::service(&state).get(id).await?))
}

async fn create_item<K: CatalogRoute>(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_form(multipart, "image").await?;
    let name = form
        .text("name")
        .map(str::to_string)
        .ok_or_else(|| ApiError::validation_error("name is required"))?;
    let image = store_image::<K>(&state, &form)
        .await?
        .ok_or_else(|| ApiError::validation_error("image is required"))?;

    match K::service(&state).create(&name, &image).await {
        Ok(item) => Ok((StatusCode::CREATED, Json(item))),
        Err(e) => {
            state.files.remove(&image).await;
            Err(e.into())
        }
    }
}

async fn update_item<K: CatalogRoute>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<CatalogItem>, ApiError> {
    let form = read_form(multipart, "image").await?;
    let image = store_image::<K>(&state, &form).await?;
    let input = UpdateCatalogInput {
        name: form.text("name").map(str::to_string),
        image: image.clone(),
    };

    match K::service(&state).update(id, input).await {
        Ok(item) => Ok(Json(item)),
        Err(e) => {
            if let Some(image) = image {
                state.files.remove(&image).await;
            }
            Err(e.into())
        }
    }
}

async fn delete_item<K: CatalogRoute>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    K::service(&state).delete(id).await?;
    Ok(Json(MessageResponse::new(format!("{} {} deleted", K::KIND, id))))
}

/// Store the form's image under the catalog's upload directory
async fn store_image<K: CatalogRoute>(state: &AppState, form: &FormData) -> Result<Option<String>, ApiError> {
    let Some(file) = form.file.as_ref() else {
        return Ok(None);
    };
    let stored = state
        .files
        .store(Some(K::KIND.upload_dir()), &file.content_type, &file.data)
        .await?;
    Ok(Some(stored.url))
}
