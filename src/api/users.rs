//! User API endpoints
//!
//! - GET /api/v1/users - List users (staff)
//! - GET /api/v1/users/{id} - Get a user (self or staff)
//! - PATCH /api/v1/users/{id} - Update a user (self or staff; role/status admin only)
//! - DELETE /api/v1/users/{id} - Delete a user (self or admin)

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::common::{validate_phone, ListQuery, MessageResponse};
use crate::api::extract::{ValidQuery, ValidatedJson};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{PagedResult, UpdateUserInput, User, UserFilter, UserRole, UserSort, UserStatus};

#[derive(Debug, Default, Deserialize)]
pub struct UserFilterQuery {
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub region_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 2, max = 55, message = "full_name must be 2 to 55 characters"))]
    pub full_name: Option<String>,
    #[validate(email(message = "email is not a valid address"))]
    pub email: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    pub birth_year: Option<i32>,
    pub region_id: Option<i64>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
}

/// Routes any signed-in user may call
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/{id}", get(get_user).patch(update_user).delete(delete_user))
}

/// Routes for staff only
pub fn staff_router() -> Router<AppState> {
    Router::new().route("/", get(list_users))
}

async fn list_users(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListQuery>,
    ValidQuery(filter): ValidQuery<UserFilterQuery>,
) -> Result<Json<PagedResult<User>>, ApiError> {
    let params = query.to_params::<UserSort>()?;
    let filter = UserFilter {
        role: filter.role,
        status: filter.status,
        region_id: filter.region_id,
    };

    Ok(Json(state.user_service.list(&filter, &params).await?))
}

async fn get_user(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.user_service.get_for(&auth.user, id).await?))
}

async fn update_user(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<i64>,
    ValidatedJson(body): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    let input = UpdateUserInput {
        full_name: body.full_name,
        email: body.email,
        phone: body.phone,
        birth_year: body.birth_year,
        region_id: body.region_id,
        role: body.role,
        status: body.status,
    };

    Ok(Json(state.user_service.update(&auth.user, id, input).await?))
}

async fn delete_user(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.user_service.delete(&auth.user, id).await?;
    Ok(Json(MessageResponse::new(format!("User {} deleted", id))))
}
