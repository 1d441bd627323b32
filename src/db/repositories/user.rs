//! User repository
//!
//! Database operations for user accounts.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ListParams, User, UserFilter, UserRole, UserSort, UserStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by email (exact, callers lowercase it)
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Get user by phone number
    async fn get_by_phone(&self, phone: &str) -> Result<Option<User>>;

    /// Write every mutable column of a user
    async fn update(&self, user: &User) -> Result<User>;

    /// Delete a user; sessions, resources, comments and likes cascade
    async fn delete(&self, id: i64) -> Result<()>;

    /// Count total users
    async fn count(&self) -> Result<i64>;

    /// List users matching a filter, with search over name and email
    async fn list(
        &self,
        filter: &UserFilter,
        params: &ListParams<UserSort>,
    ) -> Result<(Vec<User>, i64)>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(self.pool.sqlite()?, user).await,
            DatabaseDriver::Mysql => create_user_mysql(self.pool.mysql()?, user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_user_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_user_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_column_sqlite(self.pool.sqlite()?, "email", email).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_column_mysql(self.pool.mysql()?, "email", email).await
            }
        }
    }

    async fn get_by_phone(&self, phone: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_column_sqlite(self.pool.sqlite()?, "phone", phone).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_column_mysql(self.pool.mysql()?, "phone", phone).await
            }
        }
    }

    async fn update(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_user_sqlite(self.pool.sqlite()?, user).await,
            DatabaseDriver::Mysql => update_user_mysql(self.pool.mysql()?, user).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_user_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => delete_user_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_users_sqlite(self.pool.sqlite()?).await,
            DatabaseDriver::Mysql => count_users_mysql(self.pool.mysql()?).await,
        }
    }

    async fn list(
        &self,
        filter: &UserFilter,
        params: &ListParams<UserSort>,
    ) -> Result<(Vec<User>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_users_sqlite(self.pool.sqlite()?, filter, params).await,
            DatabaseDriver::Mysql => list_users_mysql(self.pool.mysql()?, filter, params).await,
        }
    }
}

const USER_COLUMNS: &str = "id, full_name, email, phone, password_hash, role, status, birth_year, region_id, created_at, updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (full_name, email, phone, password_hash, role, status, birth_year, region_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.full_name)
    .bind(&user.email)
    .bind(&user.phone)
    .bind(&user.password_hash)
    .bind(user.role.to_string())
    .bind(user.status.to_string())
    .bind(user.birth_year)
    .bind(user.region_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    row.as_ref().map(row_to_user_sqlite).transpose()
}

async fn get_user_by_column_sqlite(
    pool: &SqlitePool,
    column: &'static str,
    value: &str,
) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
    let row = sqlx::query(&sql)
        .bind(value)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get user by {}", column))?;

    row.as_ref().map(row_to_user_sqlite).transpose()
}

async fn update_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    sqlx::query(
        r#"
        UPDATE users
        SET full_name = ?, email = ?, phone = ?, password_hash = ?, role = ?, status = ?,
            birth_year = ?, region_id = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.full_name)
    .bind(&user.email)
    .bind(&user.phone)
    .bind(&user.password_hash)
    .bind(user.role.to_string())
    .bind(user.status.to_string())
    .bind(user.birth_year)
    .bind(user.region_id)
    .bind(Utc::now())
    .bind(user.id)
    .execute(pool)
    .await
    .context("Failed to update user")?;

    get_user_by_id_sqlite(pool, user.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User not found after update"))
}

async fn delete_user_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete user")?;

    Ok(())
}

async fn count_users_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

async fn list_users_sqlite(
    pool: &SqlitePool,
    filter: &UserFilter,
    params: &ListParams<UserSort>,
) -> Result<(Vec<User>, i64)> {
    let where_clause = r#"
        WHERE (? IS NULL OR role = ?)
          AND (? IS NULL OR status = ?)
          AND (? IS NULL OR region_id = ?)
          AND (? IS NULL OR full_name LIKE ? ESCAPE '\' OR email LIKE ? ESCAPE '\')
    "#;
    let role = filter.role.map(|r| r.to_string());
    let status = filter.status.map(|s| s.to_string());
    let pattern = params.contains_pattern();

    let sql = format!(
        "SELECT {} FROM users {} ORDER BY {} LIMIT ? OFFSET ?",
        USER_COLUMNS,
        where_clause,
        params.order_by()
    );
    let rows = sqlx::query(&sql)
        .bind(&role)
        .bind(&role)
        .bind(&status)
        .bind(&status)
        .bind(filter.region_id)
        .bind(filter.region_id)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;

    let users = rows
        .iter()
        .map(row_to_user_sqlite)
        .collect::<Result<Vec<_>>>()?;

    let count_sql = format!("SELECT COUNT(*) as count FROM users {}", where_clause);
    let total: i64 = sqlx::query(&count_sql)
        .bind(&role)
        .bind(&role)
        .bind(&status)
        .bind(&status)
        .bind(filter.region_id)
        .bind(filter.region_id)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_one(pool)
        .await
        .context("Failed to count users")?
        .get("count");

    Ok((users, total))
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = UserRole::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    let status_str: String = row.get("status");
    let status = UserStatus::from_str(&status_str)
        .with_context(|| format!("Invalid status in database: {}", status_str))?;

    Ok(User {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        phone: row.get("phone"),
        password_hash: row.get("password_hash"),
        role,
        status,
        birth_year: row.get("birth_year"),
        region_id: row.get("region_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (full_name, email, phone, password_hash, role, status, birth_year, region_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.full_name)
    .bind(&user.email)
    .bind(&user.phone)
    .bind(&user.password_hash)
    .bind(user.role.to_string())
    .bind(user.status.to_string())
    .bind(user.birth_year)
    .bind(user.region_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn get_user_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    row.as_ref().map(row_to_user_mysql).transpose()
}

async fn get_user_by_column_mysql(
    pool: &MySqlPool,
    column: &'static str,
    value: &str,
) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
    let row = sqlx::query(&sql)
        .bind(value)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get user by {}", column))?;

    row.as_ref().map(row_to_user_mysql).transpose()
}

async fn update_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    sqlx::query(
        r#"
        UPDATE users
        SET full_name = ?, email = ?, phone = ?, password_hash = ?, role = ?, status = ?,
            birth_year = ?, region_id = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.full_name)
    .bind(&user.email)
    .bind(&user.phone)
    .bind(&user.password_hash)
    .bind(user.role.to_string())
    .bind(user.status.to_string())
    .bind(user.birth_year)
    .bind(user.region_id)
    .bind(Utc::now())
    .bind(user.id)
    .execute(pool)
    .await
    .context("Failed to update user")?;

    get_user_by_id_mysql(pool, user.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User not found after update"))
}

async fn delete_user_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete user")?;

    Ok(())
}

async fn count_users_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

async fn list_users_mysql(
    pool: &MySqlPool,
    filter: &UserFilter,
    params: &ListParams<UserSort>,
) -> Result<(Vec<User>, i64)> {
    let where_clause = r#"
        WHERE (? IS NULL OR role = ?)
          AND (? IS NULL OR status = ?)
          AND (? IS NULL OR region_id = ?)
          AND (? IS NULL OR full_name LIKE ? OR email LIKE ?)
    "#;
    let role = filter.role.map(|r| r.to_string());
    let status = filter.status.map(|s| s.to_string());
    let pattern = params.contains_pattern();

    let sql = format!(
        "SELECT {} FROM users {} ORDER BY {} LIMIT ? OFFSET ?",
        USER_COLUMNS,
        where_clause,
        params.order_by()
    );
    let rows = sqlx::query(&sql)
        .bind(&role)
        .bind(&role)
        .bind(&status)
        .bind(&status)
        .bind(filter.region_id)
        .bind(filter.region_id)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;

    let users = rows
        .iter()
        .map(row_to_user_mysql)
        .collect::<Result<Vec<_>>>()?;

    let count_sql = format!("SELECT COUNT(*) as count FROM users {}", where_clause);
    let total: i64 = sqlx::query(&count_sql)
        .bind(&role)
        .bind(&role)
        .bind(&status)
        .bind(&status)
        .bind(filter.region_id)
        .bind(filter.region_id)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_one(pool)
        .await
        .context("Failed to count users")?
        .get("count");

    Ok((users, total))
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = UserRole::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    let status_str: String = row.get("status");
    let status = UserStatus::from_str(&status_str)
        .with_context(|| format!("Invalid status in database: {}", status_str))?;

    Ok(User {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        phone: row.get("phone"),
        password_hash: row.get("password_hash"),
        role,
        status,
        birth_year: row.get("birth_year"),
        region_id: row.get("region_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
