//! User model
//!
//! Accounts, their roles and their lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::pagination::sort_fields;

/// A registered account.
///
/// Access is decided by `role` (what the account may do) and `status`
/// (whether it may sign in at all).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    pub full_name: String,
    /// Email address (unique, stored lowercase)
    pub email: String,
    /// Phone number in `+<12 digits>` form (unique)
    pub phone: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub birth_year: i32,
    pub region_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new pending user.
    ///
    /// The password must already be hashed with
    /// `services::password::hash_password()`.
    pub fn new(
        full_name: String,
        email: String,
        phone: String,
        password_hash: String,
        role: UserRole,
        birth_year: i32,
        region_id: Option<i64>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            full_name,
            email,
            phone,
            password_hash,
            role,
            status: UserStatus::Pending,
            birth_year,
            region_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Admins and super-admins
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    pub fn is_ceo(&self) -> bool {
        self.role == UserRole::Ceo
    }

    /// Whether this user may modify something owned by `owner_id`
    pub fn can_manage(&self, owner_id: i64) -> bool {
        self.is_staff() || self.id == owner_id
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// User role for authorization.
///
/// - Admin: full access, the only role that changes roles and statuses
/// - SuperAdmin: staff access to every directory module
/// - Ceo: owns education centers
/// - User: regular account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum UserRole {
    Admin,
    SuperAdmin,
    Ceo,
    #[default]
    User,
}

impl UserRole {
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::SuperAdmin)
    }

    /// Roles a visitor may pick for themself at registration
    pub fn is_self_assignable(&self) -> bool {
        matches!(self, UserRole::User | UserRole::Ceo)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::SuperAdmin => write!(f, "super-admin"),
            UserRole::Ceo => write!(f, "ceo"),
            UserRole::User => write!(f, "user"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "super-admin" => Ok(UserRole::SuperAdmin),
            "ceo" => Ok(UserRole::Ceo),
            "user" => Ok(UserRole::User),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Account lifecycle status.
///
/// Pending accounts have not verified their email yet; banned accounts
/// cannot sign in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Pending,
    Active,
    Banned,
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserStatus::Pending => write!(f, "pending"),
            UserStatus::Active => write!(f, "active"),
            UserStatus::Banned => write!(f, "banned"),
        }
    }
}

impl FromStr for UserStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(UserStatus::Pending),
            "active" => Ok(UserStatus::Active),
            "banned" => Ok(UserStatus::Banned),
            _ => Err(anyhow::anyhow!("Invalid user status: {}", s)),
        }
    }
}

/// Filters for listing users
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub region_id: Option<i64>,
}

/// Partial update of a user; `None` leaves the field unchanged
#[derive(Debug, Clone, Default)]
pub struct UpdateUserInput {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birth_year: Option<i32>,
    pub region_id: Option<i64>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
}

impl UpdateUserInput {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.birth_year.is_none()
            && self.region_id.is_none()
            && self.role.is_none()
            && self.status.is_none()
    }
}

sort_fields! {
    /// Sortable user columns
    UserSort, default = Id,
    {
        Id => ("id", "id"),
        FullName => ("full_name", "full_name"),
        Email => ("email", "email"),
        BirthYear => ("birth_year", "birth_year"),
        CreatedAt => ("created_at", "created_at"),
    }
}
