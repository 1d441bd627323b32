//! Course registration API endpoints
//!
//! All routes require a signed-in user:
//! - GET /api/v1/course-registrations (filters user_id, edu_center_id, branch_id)
//! - GET /api/v1/course-registrations/{id}
//! - POST /api/v1/course-registrations
//! - PATCH /api/v1/course-registrations/{id} - Owner or staff
//! - DELETE /api/v1/course-registrations/{id} - Owner or staff

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::common::{ListQuery, MessageResponse};
use crate::api::extract::{ValidQuery, ValidatedJson};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{
    CourseRegistration, PagedResult, RegistrationFilter, RegistrationSort, RegistrationTarget,
    UpdateRegistrationInput,
};

#[derive(Debug, Default, Deserialize)]
pub struct RegistrationFilterQuery {
    pub user_id: Option<i64>,
    pub edu_center_id: Option<i64>,
    pub branch_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRegistrationRequest {
    pub edu_center_id: i64,
    pub branch_id: i64,
    pub subject_id: i64,
    pub field_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRegistrationRequest {
    pub edu_center_id: Option<i64>,
    pub branch_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub field_id: Option<i64>,
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_registrations).post(create_registration))
        .route(
            "/{id}",
            get(get_registration)
                .patch(update_registration)
                .delete(delete_registration),
        )
}

async fn list_registrations(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ValidQuery(query): ValidQuery<ListQuery>,
    ValidQuery(filter): ValidQuery<RegistrationFilterQuery>,
) -> Result<Json<PagedResult<CourseRegistration>>, ApiError> {
    let params = query.to_params::<RegistrationSort>()?;
    let filter = RegistrationFilter {
        user_id: filter.user_id,
        edu_center_id: filter.edu_center_id,
        branch_id: filter.branch_id,
    };
    Ok(Json(
        state
            .registration_service
            .list(&auth.user, filter, &params)
            .await?,
    ))
}

async fn get_registration(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<CourseRegistration>, ApiError> {
    Ok(Json(state.registration_service.get(&auth.user, id).await?))
}

async fn create_registration(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ValidatedJson(body): ValidatedJson<CreateRegistrationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let target = RegistrationTarget {
        edu_center_id: body.edu_center_id,
        branch_id: body.branch_id,
        subject_id: body.subject_id,
        field_id: body.field_id,
    };
    let registration = state.registration_service.create(&auth.user, target).await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

async fn update_registration(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<i64>,
    ValidatedJson(body): ValidatedJson<UpdateRegistrationRequest>,
) -> Result<Json<CourseRegistration>, ApiError> {
    let input = UpdateRegistrationInput {
        edu_center_id: body.edu_center_id,
        branch_id: body.branch_id,
        subject_id: body.subject_id,
        field_id: body.field_id,
    };
    Ok(Json(
        state
            .registration_service
            .update(&auth.user, id, input)
            .await?,
    ))
}

async fn delete_registration(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.registration_service.delete(&auth.user, id).await?;
    Ok(Json(MessageResponse::new(format!("Registration {} deleted", id))))
}
