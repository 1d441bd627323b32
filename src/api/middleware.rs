//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error type every handler returns
//! - Authentication (access token + session validation)
//! - Authorization (staff-only routes)

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::db::repositories::{
    SqlxBranchRepository, SqlxCatalogRepository, SqlxCategoryRepository,
    SqlxCommentRepository, SqlxCourseRegistrationRepository, SqlxEduCenterRepository,
    SqlxLikeRepository, SqlxLinkRepository, SqlxRegionRepository, SqlxResourceRepository,
    SqlxSessionRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{CatalogKind, Session, User};
use crate::services::{
    BranchService, CatalogService, CategoryService, CommentService, CourseRegistrationService,
    EduCenterService, EmailService, FileStore, LikeService, LinkService, LoginRateLimiter,
    OtpService, RegionService, RegistrationRefs, ResourceService, ServiceError, TokenService,
    UploadError, UserService, UserServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub user_service: Arc<UserService>,
    pub region_service: Arc<RegionService>,
    pub category_service: Arc<CategoryService>,
    pub resource_service: Arc<ResourceService>,
    pub subject_service: Arc<CatalogService>,
    pub field_service: Arc<CatalogService>,
    pub edu_center_service: Arc<EduCenterService>,
    pub edu_subject_service: Arc<LinkService>,
    pub edu_field_service: Arc<LinkService>,
    pub branch_service: Arc<BranchService>,
    pub registration_service: Arc<CourseRegistrationService>,
    pub comment_service: Arc<CommentService>,
    pub like_service: Arc<LikeService>,
    pub files: Arc<FileStore>,
    pub rate_limiter: Arc<LoginRateLimiter>,
    /// Take the client IP from `X-Forwarded-For` / `X-Real-IP`
    pub trust_proxy: bool,
}

impl AppState {
    /// Wire repositories and services over one pool
    pub fn build(pool: DynDatabasePool, config: &Config) -> Self {
        let users = SqlxUserRepository::boxed(pool.clone());
        let sessions = SqlxSessionRepository::boxed(pool.clone());
        let regions = SqlxRegionRepository::boxed(pool.clone());
        let categories = SqlxCategoryRepository::boxed(pool.clone());
        let subjects = SqlxCatalogRepository::boxed(pool.clone(), CatalogKind::Subject);
        let fields = SqlxCatalogRepository::boxed(pool.clone(), CatalogKind::Field);
        let subject_links = SqlxLinkRepository::boxed(pool.clone(), CatalogKind::Subject);
        let field_links = SqlxLinkRepository::boxed(pool.clone(), CatalogKind::Field);
        let centers = SqlxEduCenterRepository::boxed(pool.clone());
        let branches = SqlxBranchRepository::boxed(pool.clone());

        let files = Arc::new(FileStore::new(config.upload.clone()));

        let user_service = UserService::new(
            users.clone(),
            sessions,
            regions.clone(),
            centers.clone(),
            Arc::new(TokenService::new(&config.auth)),
            Arc::new(OtpService::new(config.otp.clone())),
            Arc::new(EmailService::new(config.smtp.clone())),
        )
        .with_email_verification(config.auth.require_email_verification);

        let registration_refs = RegistrationRefs {
            centers: centers.clone(),
            branches: branches.clone(),
            subjects: subjects.clone(),
            fields: fields.clone(),
            subject_links: subject_links.clone(),
            field_links: field_links.clone(),
        };

        Self {
            user_service: Arc::new(user_service),
            region_service: Arc::new(RegionService::new(regions.clone())),
            category_service: Arc::new(CategoryService::new(categories.clone())),
            resource_service: Arc::new(ResourceService::new(
                SqlxResourceRepository::boxed(pool.clone()),
                categories,
            )),
            subject_service: Arc::new(CatalogService::new(subjects.clone(), files.clone())),
            field_service: Arc::new(CatalogService::new(fields.clone(), files.clone())),
            edu_center_service: Arc::new(EduCenterService::new(
                centers.clone(),
                regions.clone(),
                users,
                subjects.clone(),
                fields.clone(),
                branches.clone(),
            )),
            edu_subject_service: Arc::new(LinkService::new(subject_links, subjects.clone(), centers.clone())),
            edu_field_service: Arc::new(LinkService::new(field_links, fields.clone(), centers.clone())),
            branch_service: Arc::new(BranchService::new(
                branches,
                centers.clone(),
                regions,
                subjects,
                fields,
            )),
            registration_service: Arc::new(CourseRegistrationService::new(
                SqlxCourseRegistrationRepository::boxed(pool.clone()),
                registration_refs,
            )),
            comment_service: Arc::new(CommentService::new(
                SqlxCommentRepository::boxed(pool.clone()),
                centers.clone(),
            )),
            like_service: Arc::new(LikeService::new(SqlxLikeRepository::boxed(pool.clone()), centers)),
            files,
            rate_limiter: Arc::new(LoginRateLimiter::new()),
            trust_proxy: config.server.trust_proxy,
            pool,
        }
    }
}

/// Authenticated user and the session the access token belongs to
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub session: Session,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new("PAYLOAD_TOO_LARGE", message)
    }

    pub fn rate_limited(message: impl Into<String>, retry_after_secs: u64) -> Self {
        Self::with_details(
            "RATE_LIMIT",
            message,
            serde_json::json!({ "retry_after": retry_after_secs }),
        )
    }

    /// Log the cause and answer with a generic message
    pub fn internal(err: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {:#}", err);
        Self::new("INTERNAL_ERROR", "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" | "USER_BANNED" | "NOT_VERIFIED" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "CONFLICT" => StatusCode::CONFLICT,
            "PAYLOAD_TOO_LARGE" => StatusCode::PAYLOAD_TOO_LARGE,
            "RATE_LIMIT" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(msg) => ApiError::not_found(msg),
            ServiceError::Validation(msg) => ApiError::validation_error(msg),
            ServiceError::Conflict(msg) => ApiError::conflict(msg),
            ServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            ServiceError::Internal(e) => ApiError::internal(e),
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::UserExists(msg) | UserServiceError::Conflict(msg) => ApiError::conflict(msg),
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::NotVerified => ApiError::new("NOT_VERIFIED", err.to_string()),
            UserServiceError::Banned => ApiError::new("USER_BANNED", err.to_string()),
            UserServiceError::InvalidOtp => ApiError::validation_error(err.to_string()),
            UserServiceError::NotFound(msg) => ApiError::not_found(msg),
            UserServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            UserServiceError::SessionNotFound => ApiError::not_found(err.to_string()),
            UserServiceError::SessionExpired => ApiError::unauthorized(err.to_string()),
            UserServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::UnsupportedType(_) => ApiError::validation_error(err.to_string()),
            UploadError::TooLarge(_) => ApiError::payload_too_large(err.to_string()),
            UploadError::Io(e) => ApiError::internal(e),
        }
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Token from an `Authorization: Bearer ...` header
pub fn extract_bearer_token(parts_headers: &axum::http::HeaderMap) -> Option<&str> {
    parts_headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Authentication middleware.
///
/// Accepts only access tokens whose session still exists and whose user is
/// active.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?
        .to_string();

    let (user, session) = state
        .user_service
        .validate_access(&token)
        .await
        .map_err(|e| match e {
            UserServiceError::SessionNotFound => ApiError::unauthorized("Session has been revoked"),
            other => ApiError::from(other),
        })?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser { user, session });
    Ok(next.run(request).await)
}

/// Staff authorization middleware (admin or super-admin)
pub async fn require_staff(request: Request, next: Next) -> Result<Response, ApiError> {
    let auth = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !auth.user.is_staff() {
        return Err(ApiError::forbidden("Staff privileges required"));
    }

    Ok(next.run(request).await)
}
