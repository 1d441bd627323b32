//! User service
//!
//! Accounts and authentication:
//! - registration (first account becomes admin) with OTP email verification
//! - login creating or renewing one session per user and client IP
//! - JWT access/refresh issuance bound to that session
//! - session listing, revocation and password changes
//! - account administration

use crate::db::repositories::{
    EduCenterRepository, RegionRepository, SessionRepository, UserRepository,
};
use crate::db::is_unique_violation;
use crate::models::{
    DeviceInfo, ListParams, PagedResult, Session, SessionView, UpdateUserInput, User, UserFilter,
    UserRole, UserSort, UserStatus,
};
use crate::services::email::EmailService;
use crate::services::otp::OtpService;
use crate::services::password::{hash_password, verify_password};
use crate::services::token::{TokenPair, TokenService, TOKEN_TYPE_BEARER};
use anyhow::Context;
use chrono::{Datelike, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials or token)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Email or phone already registered
    #[error("User already exists: {0}")]
    UserExists(String),

    /// Email address not verified yet
    #[error("Email address is not verified")]
    NotVerified,

    #[error("Account is banned")]
    Banned,

    #[error("Invalid or expired verification code")]
    InvalidOtp,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    /// Account still owns rows that block the operation
    #[error("{0}")]
    Conflict(String),

    #[error("Session not found")]
    SessionNotFound,

    #[error("Session expired")]
    SessionExpired,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Input for user registration (already shape-validated)
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub birth_year: i32,
    pub region_id: Option<i64>,
    /// Requested role; only `user` and `ceo` may be self-assigned
    pub role: Option<UserRole>,
}

/// Input for user login
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Where a request came from
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip: String,
    pub device: DeviceInfo,
}

/// Result of a successful login
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub user: User,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// A fresh access token issued from a refresh token
#[derive(Debug, Clone, Serialize)]
pub struct RefreshOutcome {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    region_repo: Arc<dyn RegionRepository>,
    center_repo: Arc<dyn EduCenterRepository>,
    tokens: Arc<TokenService>,
    otp: Arc<OtpService>,
    email: Arc<EmailService>,
    require_email_verification: bool,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        region_repo: Arc<dyn RegionRepository>,
        center_repo: Arc<dyn EduCenterRepository>,
        tokens: Arc<TokenService>,
        otp: Arc<OtpService>,
        email: Arc<EmailService>,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            region_repo,
            center_repo,
            tokens,
            otp,
            email,
            require_email_verification: true,
        }
    }

    /// When disabled, new accounts are active immediately
    pub fn with_email_verification(mut self, required: bool) -> Self {
        self.require_email_verification = required;
        self
    }

    // ========================================================================
    // Registration and verification
    // ========================================================================

    /// Register a new account.
    ///
    /// The first account becomes an admin and may omit its region. Other
    /// accounts pick `user` (default) or `ceo` and must name an existing
    /// region. Pending accounts are sent a verification code.
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let email = normalize_email(&input.email);
        check_birth_year(input.birth_year)?;

        let is_first = self.is_first_user().await?;
        let role = match (is_first, input.role) {
            (true, _) => UserRole::Admin,
            (false, None) => UserRole::User,
            (false, Some(role)) if role.is_self_assignable() => role,
            (false, Some(role)) => {
                return Err(UserServiceError::ValidationError(format!(
                    "Role '{}' cannot be chosen at registration",
                    role
                )))
            }
        };

        match input.region_id {
            Some(region_id) => self.ensure_region_exists(region_id).await?,
            None if !is_first => {
                return Err(UserServiceError::ValidationError(
                    "region_id is required".to_string(),
                ))
            }
            None => {}
        }

        self.ensure_unique(&email, &input.phone, None).await?;

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let mut user = User::new(
            input.full_name.trim().to_string(),
            email,
            input.phone,
            password_hash,
            role,
            input.birth_year,
            input.region_id,
        );
        if !self.require_email_verification {
            user.status = UserStatus::Active;
        }

        let created = self.user_repo.create(&user).await.map_err(|e| {
            if is_unique_violation(&e) {
                UserServiceError::UserExists("Email or phone is already registered".to_string())
            } else {
                UserServiceError::InternalError(e.context("Failed to create user"))
            }
        })?;

        tracing::info!("Registered user {} with role {}", created.id, created.role);

        if created.status == UserStatus::Pending {
            self.deliver_otp(&created.email).await;
        }

        Ok(created)
    }

    /// Send a fresh verification code to a pending account
    pub async fn send_otp(&self, email: &str) -> Result<(), UserServiceError> {
        let user = self.require_by_email(email).await?;
        match user.status {
            UserStatus::Active => Err(UserServiceError::ValidationError(
                "Email is already verified".to_string(),
            )),
            UserStatus::Banned => Err(UserServiceError::Banned),
            UserStatus::Pending => {
                self.deliver_otp(&user.email).await;
                Ok(())
            }
        }
    }

    /// Verify an email address with a code; already active accounts pass
    pub async fn verify(&self, email: &str, code: &str) -> Result<User, UserServiceError> {
        let mut user = self.require_by_email(email).await?;
        match user.status {
            UserStatus::Active => return Ok(user),
            UserStatus::Banned => return Err(UserServiceError::Banned),
            UserStatus::Pending => {}
        }

        if !self.otp.verify(&user.email, code)? {
            return Err(UserServiceError::InvalidOtp);
        }

        user.status = UserStatus::Active;
        let updated = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to activate user")?;

        tracing::info!("User {} verified their email", updated.id);
        Ok(updated)
    }

    // ========================================================================
    // Login, tokens and sessions
    // ========================================================================

    /// Check credentials and open (or renew) the session for this client IP
    pub async fn login(&self, input: LoginInput, client: ClientInfo) -> Result<LoginOutcome, UserServiceError> {
        let invalid = || UserServiceError::AuthenticationError("Invalid email or password".to_string());

        let user = self
            .user_repo
            .get_by_email(&normalize_email(&input.email))
            .await
            .context("Failed to get user by email")?
            .ok_or_else(invalid)?;

        if !verify_password(&input.password, &user.password_hash).context("Failed to verify password")? {
            return Err(invalid());
        }

        match user.status {
            UserStatus::Banned => return Err(UserServiceError::Banned),
            UserStatus::Pending => return Err(UserServiceError::NotVerified),
            UserStatus::Active => {}
        }

        let session = self.open_session(&user, client).await?;
        let tokens = self
            .tokens
            .issue_pair(user.id, user.role, &session.id)
            .context("Failed to issue tokens")?;

        tracing::info!("User {} logged in from {}", user.id, session.ip);
        Ok(LoginOutcome { user, tokens })
    }

    /// Exchange a refresh token for a new access token
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshOutcome, UserServiceError> {
        let claims = self
            .tokens
            .verify_refresh(refresh_token)
            .map_err(|_| UserServiceError::AuthenticationError("Invalid refresh token".to_string()))?;

        let session = self.live_session(&claims.sid, claims.sub).await?;
        let user = self.active_user(session.user_id).await?;

        self.session_repo
            .touch(&session.id)
            .await
            .context("Failed to touch session")?;

        let access_token = self
            .tokens
            .issue_access(user.id, user.role, &session.id)
            .context("Failed to issue access token")?;

        Ok(RefreshOutcome {
            access_token,
            token_type: TOKEN_TYPE_BEARER,
            expires_in: self.tokens.access_ttl_seconds(),
        })
    }

    /// Resolve an access token to its user and session.
    ///
    /// The session must still exist and be unexpired, and the user must be
    /// active, so revoked sessions and banned users are rejected even while
    /// the JWT itself is valid.
    pub async fn validate_access(&self, access_token: &str) -> Result<(User, Session), UserServiceError> {
        let claims = self
            .tokens
            .verify_access(access_token)
            .map_err(|_| UserServiceError::AuthenticationError("Invalid or expired token".to_string()))?;

        let session = self.live_session(&claims.sid, claims.sub).await?;
        let user = self.active_user(session.user_id).await?;

        Ok((user, session))
    }

    /// Delete a session (logout)
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;

        Ok(())
    }

    /// Sessions of a user, flagging the one the request was made with
    pub async fn list_sessions(&self, user_id: i64, current_session_id: &str) -> Result<Vec<SessionView>, UserServiceError> {
        let sessions = self
            .session_repo
            .list_by_user(user_id)
            .await
            .context("Failed to list sessions")?;

        Ok(sessions
            .into_iter()
            .map(|session| SessionView {
                current: session.id == current_session_id,
                session,
            })
            .collect())
    }

    /// Delete one of the user's own sessions
    pub async fn delete_session(&self, user_id: i64, session_id: &str) -> Result<(), UserServiceError> {
        match self
            .session_repo
            .get_by_id(session_id)
            .await
            .context("Failed to get session")?
        {
            Some(session) if session.user_id == user_id => self.logout(session_id).await,
            _ => Err(UserServiceError::SessionNotFound),
        }
    }

    /// Change a password and sign out every other session.
    ///
    /// Returns the number of sessions revoked.
    pub async fn change_password(
        &self,
        user: &User,
        current_session_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<i64, UserServiceError> {
        if !verify_password(current_password, &user.password_hash).context("Failed to verify password")? {
            return Err(UserServiceError::ValidationError(
                "Current password is incorrect".to_string(),
            ));
        }

        let mut updated = user.clone();
        updated.password_hash = hash_password(new_password).context("Failed to hash password")?;
        self.user_repo
            .update(&updated)
            .await
            .context("Failed to update password")?;

        let revoked = self
            .session_repo
            .delete_others(user.id, current_session_id)
            .await
            .context("Failed to revoke sessions")?;

        tracing::info!("User {} changed password, {} sessions revoked", user.id, revoked);
        Ok(revoked)
    }

    /// Delete all expired sessions; returns how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<i64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;

        Ok(count)
    }

    // ========================================================================
    // Account administration
    // ========================================================================

    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self.user_repo.count().await.context("Failed to count users")?;
        Ok(count == 0)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;

        Ok(user)
    }

    /// List users (staff only, enforced by the caller's route)
    pub async fn list(
        &self,
        filter: &UserFilter,
        params: &ListParams<UserSort>,
    ) -> Result<PagedResult<User>, UserServiceError> {
        let (users, total) = self
            .user_repo
            .list(filter, params)
            .await
            .context("Failed to list users")?;

        Ok(PagedResult::new(users, total, params))
    }

    /// Fetch a user the actor may see: themself, or anyone for staff
    pub async fn get_for(&self, actor: &User, id: i64) -> Result<User, UserServiceError> {
        if !actor.can_manage(id) {
            return Err(UserServiceError::Forbidden(
                "You can only view your own account".to_string(),
            ));
        }
        self.require_by_id(id).await
    }

    /// Apply a partial update. Only admins change roles and statuses.
    pub async fn update(&self, actor: &User, id: i64, input: UpdateUserInput) -> Result<User, UserServiceError> {
        if !actor.can_manage(id) {
            return Err(UserServiceError::Forbidden(
                "You can only edit your own account".to_string(),
            ));
        }
        if (input.role.is_some() || input.status.is_some()) && !actor.is_admin() {
            return Err(UserServiceError::Forbidden(
                "Only an admin can change roles and statuses".to_string(),
            ));
        }
        if input.is_empty() {
            return Err(UserServiceError::ValidationError(
                "At least one field must be provided".to_string(),
            ));
        }

        let mut user = self.require_by_id(id).await?;

        let email = input.email.as_deref().map(normalize_email);
        if email.is_some() || input.phone.is_some() {
            self.ensure_unique(
                email.as_deref().unwrap_or(&user.email),
                input.phone.as_deref().unwrap_or(&user.phone),
                Some(user.id),
            )
            .await?;
        }
        if let Some(region_id) = input.region_id {
            self.ensure_region_exists(region_id).await?;
        }
        if let Some(birth_year) = input.birth_year {
            check_birth_year(birth_year)?;
        }

        if let Some(full_name) = input.full_name {
            user.full_name = full_name.trim().to_string();
        }
        if let Some(email) = email {
            user.email = email;
        }
        if let Some(phone) = input.phone {
            user.phone = phone;
        }
        if let Some(birth_year) = input.birth_year {
            user.birth_year = birth_year;
        }
        if input.region_id.is_some() {
            user.region_id = input.region_id;
        }
        if let Some(role) = input.role {
            user.role = role;
        }
        if let Some(status) = input.status {
            user.status = status;
        }

        let updated = self.user_repo.update(&user).await.map_err(|e| {
            if is_unique_violation(&e) {
                UserServiceError::UserExists("Email or phone is already registered".to_string())
            } else {
                UserServiceError::InternalError(e.context("Failed to update user"))
            }
        })?;

        Ok(updated)
    }

    /// Delete an account: the account itself or an admin.
    ///
    /// Refused while the account owns education centers.
    pub async fn delete(&self, actor: &User, id: i64) -> Result<(), UserServiceError> {
        if actor.id != id && !actor.is_admin() {
            return Err(UserServiceError::Forbidden(
                "You can only delete your own account".to_string(),
            ));
        }
        let user = self.require_by_id(id).await?;

        let owned = self
            .center_repo
            .count_by_user(user.id)
            .await
            .context("Failed to count owned centers")?;
        if owned > 0 {
            return Err(UserServiceError::Conflict(format!(
                "User {} still owns {} education center(s)",
                user.id, owned
            )));
        }

        self.user_repo
            .delete(user.id)
            .await
            .context("Failed to delete user")?;

        tracing::info!("Deleted user {}", user.id);
        Ok(())
    }

    // ========================================================================
    // Private helper methods
    // ========================================================================

    async fn require_by_id(&self, id: i64) -> Result<User, UserServiceError> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| UserServiceError::NotFound(format!("User {} not found", id)))
    }

    async fn require_by_email(&self, email: &str) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_email(&normalize_email(email))
            .await
            .context("Failed to get user by email")?
            .ok_or_else(|| UserServiceError::NotFound("User not found".to_string()))
    }

    async fn ensure_region_exists(&self, region_id: i64) -> Result<(), UserServiceError> {
        let region = self
            .region_repo
            .get_by_id(region_id)
            .await
            .context("Failed to get region")?;
        if region.is_none() {
            return Err(UserServiceError::ValidationError(format!(
                "Region {} does not exist",
                region_id
            )));
        }
        Ok(())
    }

    /// Email and phone must not belong to another account
    async fn ensure_unique(&self, email: &str, phone: &str, except: Option<i64>) -> Result<(), UserServiceError> {
        let taken = |found: Option<User>| found.is_some_and(|u| Some(u.id) != except);

        if taken(
            self.user_repo
                .get_by_email(email)
                .await
                .context("Failed to check email")?,
        ) {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                email
            )));
        }

        if taken(
            self.user_repo
                .get_by_phone(phone)
                .await
                .context("Failed to check phone")?,
        ) {
            return Err(UserServiceError::UserExists(format!(
                "Phone '{}' is already registered",
                phone
            )));
        }

        Ok(())
    }

    /// Email a verification code; delivery problems are logged, never returned
    async fn deliver_otp(&self, email: &str) {
        let code = match self.otp.generate(email) {
            Ok(code) => code,
            Err(e) => {
                tracing::error!("Failed to generate verification code: {:#}", e);
                return;
            }
        };

        if let Err(e) = self
            .email
            .send_verification_code(email, &code, self.otp.valid_minutes())
            .await
        {
            tracing::error!("Failed to send verification email to {}: {:#}", email, e);
        }
    }

    /// One session per (user, IP): renew it if present, else create it
    async fn open_session(&self, user: &User, client: ClientInfo) -> Result<Session, UserServiceError> {
        let now = Utc::now();
        let expires_at = now + self.tokens.refresh_ttl();

        if let Some(mut existing) = self
            .session_repo
            .get_by_user_and_ip(user.id, &client.ip)
            .await
            .context("Failed to look up session")?
        {
            self.session_repo
                .renew(&existing.id, &client.device, expires_at)
                .await
                .context("Failed to renew session")?;
            existing.device = client.device;
            existing.expires_at = expires_at;
            existing.last_used_at = now;
            return Ok(existing);
        }

        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: user.id,
            ip: client.ip,
            device: client.device,
            expires_at,
            last_used_at: now,
            created_at: now,
        };

        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok(created)
    }

    /// The session a token names, if it still exists, belongs to `user_id`
    /// and has not expired
    async fn live_session(&self, session_id: &str, user_id: i64) -> Result<Session, UserServiceError> {
        let session = self
            .session_repo
            .get_by_id(session_id)
            .await
            .context("Failed to get session")?
            .filter(|s| s.user_id == user_id)
            .ok_or(UserServiceError::SessionNotFound)?;

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(&session.id).await {
                tracing::warn!("Failed to remove expired session {}: {}", session.id, e);
            }
            return Err(UserServiceError::SessionExpired);
        }

        Ok(session)
    }

    async fn active_user(&self, user_id: i64) -> Result<User, UserServiceError> {
        let user = self
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| UserServiceError::AuthenticationError("User no longer exists".to_string()))?;

        match user.status {
            UserStatus::Active => Ok(user),
            UserStatus::Banned => Err(UserServiceError::Banned),
            UserStatus::Pending => Err(UserServiceError::NotVerified),
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Accounts are for people aged 18 to 149
pub fn check_birth_year(birth_year: i32) -> Result<(), UserServiceError> {
    let current = Utc::now().year();
    let (oldest, youngest) = (current - 149, current - 18);
    if !(oldest..=youngest).contains(&birth_year) {
        return Err(UserServiceError::ValidationError(format!(
            "birth_year must be between {} and {}",
            oldest, youngest
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, OtpConfig, SmtpConfig};
    use crate::db::repositories::test_support::{insert_center, insert_region, migrated_pool};
    use crate::db::repositories::{
        SqlxEduCenterRepository, SqlxRegionRepository, SqlxSessionRepository, SqlxUserRepository,
    };
    use crate::db::DynDatabasePool;
    use chrono::Duration;

    struct Harness {
        pool: DynDatabasePool,
        service: UserService,
        otp: Arc<OtpService>,
        region: i64,
    }

    async fn setup_with(verification: bool) -> Harness {
        let pool = migrated_pool().await;
        let region = insert_region(&pool, "Tashkent").await;
        let otp = Arc::new(OtpService::new(OtpConfig::default()));
        let service = UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            SqlxRegionRepository::boxed(pool.clone()),
            SqlxEduCenterRepository::boxed(pool.clone()),
            Arc::new(TokenService::new(&AuthConfig::default())),
            otp.clone(),
            Arc::new(EmailService::new(SmtpConfig::default())),
        )
        .with_email_verification(verification);

        Harness {
            pool,
            service,
            otp,
            region,
        }
    }

    async fn setup() -> Harness {
        setup_with(true).await
    }

    fn register_input(n: u32, region_id: Option<i64>) -> RegisterInput {
        RegisterInput {
            full_name: format!("Person {}", n),
            email: format!("Person{}@Example.com", n),
            phone: format!("+998{:09}", n),
            password: "secret123".to_string(),
            birth_year: 1995,
            region_id,
            role: None,
        }
    }

    fn client(ip: &str) -> ClientInfo {
        ClientInfo {
            ip: ip.to_string(),
            device: DeviceInfo {
                browser: "Firefox".into(),
                os: "Linux".into(),
                device_type: "desktop".into(),
                user_agent: "test".into(),
            },
        }
    }

    /// Register and verify an account, returning it
    async fn active_user(h: &Harness, n: u32) -> User {
        let user = h.service.register(register_input(n, Some(h.region))).await.unwrap();
        let code = h.otp.generate(&user.email).unwrap();
        h.service.verify(&user.email, &code).await.unwrap()
    }

    // ========================================================================
    // Registration tests
    // ========================================================================

    #[test]
    fn test_birth_year_window() {
        let current = Utc::now().year();

        assert!(check_birth_year(current - 18).is_ok());
        assert!(check_birth_year(current - 149).is_ok());
        assert!(check_birth_year(current - 17).is_err());
        assert!(check_birth_year(current - 150).is_err());
    }

    #[tokio::test]
    async fn test_register_rejects_minor() {
        let h = setup().await;
        let mut input = register_input(1, None);
        input.birth_year = Utc::now().year() - 10;

        assert!(matches!(
            h.service.register(input).await,
            Err(UserServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_first_user_becomes_admin_without_region() {
        let h = setup().await;

        let user = h.service.register(register_input(1, None)).await.unwrap();

        assert_eq!(user.role, UserRole::Admin);
        assert_eq!(user.status, UserStatus::Pending);
        assert_eq!(user.email, "person1@example.com");
    }

    #[tokio::test]
    async fn test_later_users_need_region() {
        let h = setup().await;
        h.service.register(register_input(1, None)).await.unwrap();

        let missing = h.service.register(register_input(2, None)).await;
        assert!(matches!(missing, Err(UserServiceError::ValidationError(_))));

        let unknown = h.service.register(register_input(2, Some(999))).await;
        assert!(matches!(unknown, Err(UserServiceError::ValidationError(_))));

        let user = h.service.register(register_input(2, Some(h.region))).await.unwrap();
        assert_eq!(user.role, UserRole::User);
    }

    #[tokio::test]
    async fn test_register_role_choice() {
        let h = setup().await;
        h.service.register(register_input(1, None)).await.unwrap();

        let mut ceo = register_input(2, Some(h.region));
        ceo.role = Some(UserRole::Ceo);
        assert_eq!(h.service.register(ceo).await.unwrap().role, UserRole::Ceo);

        let mut admin = register_input(3, Some(h.region));
        admin.role = Some(UserRole::SuperAdmin);
        assert!(matches!(
            h.service.register(admin).await,
            Err(UserServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_register_duplicates_rejected() {
        let h = setup().await;
        h.service.register(register_input(1, None)).await.unwrap();

        let mut same_email = register_input(2, Some(h.region));
        same_email.email = "PERSON1@example.com".to_string();
        assert!(matches!(
            h.service.register(same_email).await,
            Err(UserServiceError::UserExists(_))
        ));

        let mut same_phone = register_input(3, Some(h.region));
        same_phone.phone = format!("+998{:09}", 1);
        assert!(matches!(
            h.service.register(same_phone).await,
            Err(UserServiceError::UserExists(_))
        ));
    }

    #[tokio::test]
    async fn test_register_without_verification_is_active() {
        let h = setup_with(false).await;

        let user = h.service.register(register_input(1, None)).await.unwrap();

        assert_eq!(user.status, UserStatus::Active);
    }

    // ========================================================================
    // Verification tests
    // ========================================================================

    #[tokio::test]
    async fn test_verify_activates_and_is_idempotent() {
        let h = setup().await;
        let user = h.service.register(register_input(1, None)).await.unwrap();

        let wrong = h.service.verify(&user.email, "000000").await;
        // A six-digit guess could be right by chance; only a mismatch must fail
        if h.otp.generate(&user.email).unwrap() != "000000" {
            assert!(matches!(wrong, Err(UserServiceError::InvalidOtp)));
        }

        let code = h.otp.generate(&user.email).unwrap();
        let verified = h.service.verify("PERSON1@example.com", &code).await.unwrap();
        assert_eq!(verified.status, UserStatus::Active);

        let again = h.service.verify(&user.email, "garbage").await.unwrap();
        assert_eq!(again.status, UserStatus::Active);
    }

    #[tokio::test]
    async fn test_send_otp_rules() {
        let h = setup().await;

        assert!(matches!(
            h.service.send_otp("ghost@example.com").await,
            Err(UserServiceError::NotFound(_))
        ));

        let user = h.service.register(register_input(1, None)).await.unwrap();
        h.service.send_otp(&user.email).await.unwrap();

        let code = h.otp.generate(&user.email).unwrap();
        h.service.verify(&user.email, &code).await.unwrap();
        assert!(matches!(
            h.service.send_otp(&user.email).await,
            Err(UserServiceError::ValidationError(_))
        ));
    }

    // ========================================================================
    // Login and token tests
    // ========================================================================

    #[tokio::test]
    async fn test_login_requires_verified_account() {
        let h = setup().await;
        let user = h.service.register(register_input(1, None)).await.unwrap();

        let result = h
            .service
            .login(LoginInput::new(&user.email, "secret123"), client("10.0.0.1"))
            .await;

        assert!(matches!(result, Err(UserServiceError::NotVerified)));
    }

    #[tokio::test]
    async fn test_login_wrong_password_fails() {
        let h = setup().await;
        let user = active_user(&h, 1).await;

        let result = h
            .service
            .login(LoginInput::new(&user.email, "nope-nope"), client("10.0.0.1"))
            .await;

        assert!(matches!(result, Err(UserServiceError::AuthenticationError(_))));
    }

    #[tokio::test]
    async fn test_login_banned_user_fails() {
        let h = setup().await;
        let admin = active_user(&h, 1).await;
        let user = active_user(&h, 2).await;
        h.service
            .update(
                &admin,
                user.id,
                UpdateUserInput {
                    status: Some(UserStatus::Banned),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let result = h
            .service
            .login(LoginInput::new(&user.email, "secret123"), client("10.0.0.1"))
            .await;

        assert!(matches!(result, Err(UserServiceError::Banned)));
    }

    #[tokio::test]
    async fn test_login_reuses_session_per_ip() {
        let h = setup().await;
        let user = active_user(&h, 1).await;

        let first = h
            .service
            .login(LoginInput::new(&user.email, "secret123"), client("10.0.0.1"))
            .await
            .unwrap();
        let second = h
            .service
            .login(LoginInput::new(&user.email, "secret123"), client("10.0.0.1"))
            .await
            .unwrap();
        h.service
            .login(LoginInput::new(&user.email, "secret123"), client("10.0.0.2"))
            .await
            .unwrap();

        let (_, first_session) = h.service.validate_access(&first.tokens.access_token).await.unwrap();
        let (_, second_session) = h.service.validate_access(&second.tokens.access_token).await.unwrap();
        assert_eq!(first_session.id, second_session.id);

        let sessions = h.service.list_sessions(user.id, &first_session.id).await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions.iter().filter(|s| s.current).count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_issues_access_with_current_role() {
        let h = setup().await;
        let admin = active_user(&h, 1).await;
        let user = active_user(&h, 2).await;
        let login = h
            .service
            .login(LoginInput::new(&user.email, "secret123"), client("10.0.0.1"))
            .await
            .unwrap();

        h.service
            .update(
                &admin,
                user.id,
                UpdateUserInput {
                    role: Some(UserRole::Ceo),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let refreshed = h.service.refresh(&login.tokens.refresh_token).await.unwrap();
        let (current, _) = h.service.validate_access(&refreshed.access_token).await.unwrap();
        assert_eq!(current.role, UserRole::Ceo);

        assert!(matches!(
            h.service.refresh(&login.tokens.access_token).await,
            Err(UserServiceError::AuthenticationError(_))
        ));
    }

    #[tokio::test]
    async fn test_logout_revokes_tokens() {
        let h = setup().await;
        let user = active_user(&h, 1).await;
        let login = h
            .service
            .login(LoginInput::new(&user.email, "secret123"), client("10.0.0.1"))
            .await
            .unwrap();
        let (_, session) = h.service.validate_access(&login.tokens.access_token).await.unwrap();

        h.service.logout(&session.id).await.unwrap();

        assert!(matches!(
            h.service.validate_access(&login.tokens.access_token).await,
            Err(UserServiceError::SessionNotFound)
        ));
        assert!(matches!(
            h.service.refresh(&login.tokens.refresh_token).await,
            Err(UserServiceError::SessionNotFound)
        ));
    }

    #[tokio::test]
    async fn test_expired_session_rejected() {
        let h = setup().await;
        let user = active_user(&h, 1).await;
        let login = h
            .service
            .login(LoginInput::new(&user.email, "secret123"), client("10.0.0.1"))
            .await
            .unwrap();

        sqlx::query("UPDATE sessions SET expires_at = ?")
            .bind(Utc::now() - Duration::hours(1))
            .execute(h.pool.sqlite().unwrap())
            .await
            .unwrap();

        assert!(matches!(
            h.service.validate_access(&login.tokens.access_token).await,
            Err(UserServiceError::SessionExpired)
        ));

        // The expired row is removed on first sight
        let (remaining,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
            .fetch_one(h.pool.sqlite().unwrap())
            .await
            .unwrap();
        assert_eq!(remaining, 0);
        assert!(matches!(
            h.service.validate_access(&login.tokens.access_token).await,
            Err(UserServiceError::SessionNotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_session_is_owner_restricted() {
        let h = setup().await;
        let alice = active_user(&h, 1).await;
        let bob = active_user(&h, 2).await;
        let login = h
            .service
            .login(LoginInput::new(&alice.email, "secret123"), client("10.0.0.1"))
            .await
            .unwrap();
        let (_, session) = h.service.validate_access(&login.tokens.access_token).await.unwrap();

        assert!(matches!(
            h.service.delete_session(bob.id, &session.id).await,
            Err(UserServiceError::SessionNotFound)
        ));
        h.service.delete_session(alice.id, &session.id).await.unwrap();
        assert!(h.service.list_sessions(alice.id, "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_change_password_revokes_other_sessions() {
        let h = setup().await;
        let user = active_user(&h, 1).await;
        let here = h
            .service
            .login(LoginInput::new(&user.email, "secret123"), client("10.0.0.1"))
            .await
            .unwrap();
        h.service
            .login(LoginInput::new(&user.email, "secret123"), client("10.0.0.2"))
            .await
            .unwrap();
        let (current, session) = h.service.validate_access(&here.tokens.access_token).await.unwrap();

        let wrong = h.service.change_password(&current, &session.id, "bad", "newsecret").await;
        assert!(matches!(wrong, Err(UserServiceError::ValidationError(_))));

        let revoked = h
            .service
            .change_password(&current, &session.id, "secret123", "newsecret")
            .await
            .unwrap();
        assert_eq!(revoked, 1);

        h.service
            .login(LoginInput::new(&user.email, "newsecret"), client("10.0.0.3"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cleanup_expired_sessions() {
        let h = setup().await;
        let user = active_user(&h, 1).await;
        h.service
            .login(LoginInput::new(&user.email, "secret123"), client("10.0.0.1"))
            .await
            .unwrap();
        sqlx::query("UPDATE sessions SET expires_at = ?")
            .bind(Utc::now() - Duration::minutes(1))
            .execute(h.pool.sqlite().unwrap())
            .await
            .unwrap();

        assert_eq!(h.service.cleanup_expired_sessions().await.unwrap(), 1);
    }

    // ========================================================================
    // Administration tests
    // ========================================================================

    #[tokio::test]
    async fn test_only_admin_changes_roles() {
        let h = setup().await;
        let _admin = active_user(&h, 1).await;
        let user = active_user(&h, 2).await;

        let result = h
            .service
            .update(
                &user,
                user.id,
                UpdateUserInput {
                    role: Some(UserRole::Admin),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(UserServiceError::Forbidden(_))));

        let renamed = h
            .service
            .update(
                &user,
                user.id,
                UpdateUserInput {
                    full_name: Some("  New Name ".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.full_name, "New Name");
    }

    #[tokio::test]
    async fn test_users_cannot_touch_each_other() {
        let h = setup().await;
        let _admin = active_user(&h, 1).await;
        let alice = active_user(&h, 2).await;
        let bob = active_user(&h, 3).await;

        assert!(matches!(
            h.service.get_for(&alice, bob.id).await,
            Err(UserServiceError::Forbidden(_))
        ));
        assert!(matches!(
            h.service.delete(&alice, bob.id).await,
            Err(UserServiceError::Forbidden(_))
        ));
        assert!(matches!(
            h.service.update(&alice, alice.id, UpdateUserInput::default()).await,
            Err(UserServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_update_email_conflict() {
        let h = setup().await;
        let admin = active_user(&h, 1).await;
        let user = active_user(&h, 2).await;

        let result = h
            .service
            .update(
                &user,
                user.id,
                UpdateUserInput {
                    email: Some(admin.email.to_uppercase()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_delete_refused_while_owning_centers() {
        let h = setup().await;
        let admin = active_user(&h, 1).await;
        let ceo = active_user(&h, 2).await;
        insert_center(&h.pool, "Star", h.region, ceo.id).await;

        assert!(matches!(
            h.service.delete(&admin, ceo.id).await,
            Err(UserServiceError::Conflict(_))
        ));

        let plain = active_user(&h, 3).await;
        h.service.delete(&plain, plain.id).await.unwrap();
        assert!(h.service.get_by_id(plain.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_users_paged() {
        let h = setup().await;
        for n in 1..=3 {
            active_user(&h, n).await;
        }

        let page = h
            .service
            .list(&UserFilter::default(), &ListParams::new(1, 2))
            .await
            .unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.total_pages, 2);
    }
}
