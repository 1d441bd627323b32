//! Authentication API endpoints
//!
//! Handles HTTP requests for accounts and sessions:
//! - POST /api/v1/auth/register - Create an account and email a code
//! - POST /api/v1/auth/send-otp - Email a fresh verification code
//! - POST /api/v1/auth/verify - Verify an email address
//! - POST /api/v1/auth/login - Sign in, returns access and refresh tokens
//! - POST /api/v1/auth/refresh-token - New access token from a refresh token
//! - GET /api/v1/auth/me - Current user
//! - GET /api/v1/auth/sessions - Current user's sessions
//! - DELETE /api/v1/auth/sessions/{id} - Revoke one of them
//! - POST /api/v1/auth/change-password - Change password, revoke other sessions
//! - POST /api/v1/auth/logout - Revoke the current session

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::common::{validate_phone, MessageResponse};
use crate::api::extract::{ClientMeta, ValidatedJson};
use crate::api::middleware::{extract_bearer_token, ApiError, AppState, AuthenticatedUser};
use crate::models::{SessionView, User, UserRole};
use crate::services::rate_limiter::EMAIL_WINDOW_MINUTES;
use crate::services::{LoginInput, LoginOutcome, RefreshOutcome, RegisterInput};

/// Request body for user registration
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 55, message = "full_name must be 2 to 55 characters"))]
    pub full_name: String,
    #[validate(email(message = "email is not a valid address"))]
    pub email: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(length(min = 6, max = 55, message = "password must be 6 to 55 characters"))]
    pub password: String,
    pub birth_year: i32,
    pub region_id: Option<i64>,
    pub role: Option<UserRole>,
}

/// Request body carrying only an email address
#[derive(Debug, Deserialize, Validate)]
pub struct SendOtpRequest {
    #[validate(email(message = "email is not a valid address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyRequest {
    #[validate(email(message = "email is not a valid address"))]
    pub email: String,
    #[validate(length(min = 4, max = 10, message = "otp must be 4 to 10 characters"))]
    pub otp: String,
}

/// Request body for user login
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "email is not a valid address"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "current_password is required"))]
    pub current_password: String,
    #[validate(length(min = 6, max = 55, message = "new_password must be 6 to 55 characters"))]
    pub new_password: String,
}

/// Response for a new account
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: User,
    pub message: String,
}

/// Build public auth routes (no access token required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/send-otp", post(send_otp))
        .route("/verify", post(verify))
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_current_user))
        .route("/sessions", get(list_sessions))
        .route("/sessions/{id}", delete(delete_session))
        .route("/change-password", post(change_password))
        .route("/logout", post(logout))
}

/// POST /api/v1/auth/register - User registration
///
/// The first account becomes an admin. Accounts start pending unless email
/// verification is disabled.
async fn register(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .user_service
        .register(RegisterInput {
            full_name: body.full_name,
            email: body.email,
            phone: body.phone,
            password: body.password,
            birth_year: body.birth_year,
            region_id: body.region_id,
            role: body.role,
        })
        .await?;

    let message = if user.is_active() {
        "Registration successful"
    } else {
        "Registration successful, a verification code was sent to your email"
    };

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user,
            message: message.to_string(),
        }),
    ))
}

/// POST /api/v1/auth/send-otp - Resend the verification code
async fn send_otp(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<SendOtpRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.user_service.send_otp(&body.email).await?;
    Ok(Json(MessageResponse::new("Verification code sent")))
}

/// POST /api/v1/auth/verify - Verify an email address
async fn verify(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<VerifyRequest>,
) -> Result<Json<User>, ApiError> {
    let user = state.user_service.verify(&body.email, body.otp.trim()).await?;
    Ok(Json(user))
}

/// POST /api/v1/auth/login - User login
///
/// Each client IP gets 10 requests a minute and each email 5 failed
/// attempts per 15 minutes.
async fn login(
    State(state): State<AppState>,
    client: ClientMeta,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginOutcome>, ApiError> {
    if let Some(ip) = client.ip {
        if state.rate_limiter.is_ip_limited(ip).await {
            tracing::warn!("Login rate limit hit for IP {}", ip);
            return Err(ApiError::rate_limited("Too many requests, try again later", 60));
        }
        state.rate_limiter.record_ip_request(ip).await;
    }

    if state.rate_limiter.is_email_limited(&body.email).await {
        tracing::warn!("Login rate limit hit for {}", body.email);
        return Err(ApiError::rate_limited(
            "Too many failed attempts, try again later",
            (EMAIL_WINDOW_MINUTES * 60) as u64,
        ));
    }

    let input = LoginInput::new(body.email.clone(), body.password);
    match state.user_service.login(input, client.client_info()).await {
        Ok(outcome) => {
            state.rate_limiter.clear_email_attempts(&body.email).await;
            Ok(Json(outcome))
        }
        Err(e) => {
            state.rate_limiter.record_failed_attempt(&body.email).await;
            Err(e.into())
        }
    }
}

/// POST /api/v1/auth/refresh-token - Exchange a refresh token
///
/// The refresh token is sent as the bearer token.
async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RefreshOutcome>, ApiError> {
    let token = extract_bearer_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing refresh token"))?;

    let outcome = state.user_service.refresh(token).await?;
    Ok(Json(outcome))
}

/// GET /api/v1/auth/me - Get current user
async fn get_current_user(auth: AuthenticatedUser) -> Json<User> {
    Json(auth.user)
}

/// GET /api/v1/auth/sessions - Sessions of the current user
async fn list_sessions(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<Vec<SessionView>>, ApiError> {
    let sessions = state
        .user_service
        .list_sessions(auth.user.id, &auth.session.id)
        .await?;
    Ok(Json(sessions))
}

/// DELETE /api/v1/auth/sessions/{id} - Revoke one of the caller's sessions
async fn delete_session(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.user_service.delete_session(auth.user.id, &id).await?;
    Ok(Json(MessageResponse::new("Session deleted")))
}

/// POST /api/v1/auth/change-password
async fn change_password(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ValidatedJson(body): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let revoked = state
        .user_service
        .change_password(&auth.user, &auth.session.id, &body.current_password, &body.new_password)
        .await?;

    Ok(Json(MessageResponse::new(format!(
        "Password changed, {} other sessions signed out",
        revoked
    ))))
}

/// POST /api/v1/auth/logout - Revoke the current session
async fn logout(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<MessageResponse>, ApiError> {
    state.user_service.logout(&auth.session.id).await?;
    Ok(Json(MessageResponse::new("Logged out")))
}
