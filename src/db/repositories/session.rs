//! Session repository
//!
//! Database operations for sign-in sessions. A user holds at most one
//! session per client IP.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{DeviceInfo, Session};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a new session
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Get session by ID
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    /// Get the session a user holds for a client IP
    async fn get_by_user_and_ip(&self, user_id: i64, ip: &str) -> Result<Option<Session>>;

    /// Sessions of a user, most recently used first
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Session>>;

    /// Extend a session and record the device it was renewed from
    async fn renew(&self, id: &str, device: &DeviceInfo, expires_at: DateTime<Utc>) -> Result<()>;

    /// Record activity on a session
    async fn touch(&self, id: &str) -> Result<()>;

    /// Delete a session
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete all sessions for a user except `keep_id`
    async fn delete_others(&self, user_id: i64, keep_id: &str) -> Result<i64>;

    /// Delete expired sessions
    async fn delete_expired(&self) -> Result<i64>;
}

/// SQLx-based session repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    /// Create a new SQLx session repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_session_sqlite(self.pool.sqlite()?, session).await,
            DatabaseDriver::Mysql => create_session_mysql(self.pool.mysql()?, session).await,
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_session_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_session_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn get_by_user_and_ip(&self, user_id: i64, ip: &str) -> Result<Option<Session>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_session_by_user_and_ip_sqlite(self.pool.sqlite()?, user_id, ip).await
            }
            DatabaseDriver::Mysql => {
                get_session_by_user_and_ip_mysql(self.pool.mysql()?, user_id, ip).await
            }
        }
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Session>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sessions_by_user_sqlite(self.pool.sqlite()?, user_id).await,
            DatabaseDriver::Mysql => list_sessions_by_user_mysql(self.pool.mysql()?, user_id).await,
        }
    }

    async fn renew(&self, id: &str, device: &DeviceInfo, expires_at: DateTime<Utc>) -> Result<()> {
        let device_json = serde_json::to_string(device).context("Failed to encode device")?;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                renew_session_sqlite(self.pool.sqlite()?, id, &device_json, expires_at).await
            }
            DatabaseDriver::Mysql => {
                renew_session_mysql(self.pool.mysql()?, id, &device_json, expires_at).await
            }
        }
    }

    async fn touch(&self, id: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => touch_session_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => touch_session_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_session_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => delete_session_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn delete_others(&self, user_id: i64, keep_id: &str) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_other_sessions_sqlite(self.pool.sqlite()?, user_id, keep_id).await
            }
            DatabaseDriver::Mysql => {
                delete_other_sessions_mysql(self.pool.mysql()?, user_id, keep_id).await
            }
        }
    }

    async fn delete_expired(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_expired_sessions_sqlite(self.pool.sqlite()?).await,
            DatabaseDriver::Mysql => delete_expired_sessions_mysql(self.pool.mysql()?).await,
        }
    }
}

fn parse_device(json: &str) -> DeviceInfo {
    serde_json::from_str(json).unwrap_or_default()
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_session_sqlite(pool: &SqlitePool, session: &Session) -> Result<Session> {
    let device = serde_json::to_string(&session.device).context("Failed to encode device")?;

    sqlx::query(
        r#"
        INSERT INTO sessions (id, user_id, ip, device, expires_at, last_used_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(session.user_id)
    .bind(&session.ip)
    .bind(&device)
    .bind(session.expires_at)
    .bind(session.last_used_at)
    .bind(session.created_at)
    .execute(pool)
    .await
    .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_by_id_sqlite(pool: &SqlitePool, id: &str) -> Result<Option<Session>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, ip, device, expires_at, last_used_at, created_at
        FROM sessions
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get session by ID")?;

    Ok(row.as_ref().map(row_to_session_sqlite))
}

async fn get_session_by_user_and_ip_sqlite(
    pool: &SqlitePool,
    user_id: i64,
    ip: &str,
) -> Result<Option<Session>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, ip, device, expires_at, last_used_at, created_at
        FROM sessions
        WHERE user_id = ? AND ip = ?
        "#,
    )
    .bind(user_id)
    .bind(ip)
    .fetch_optional(pool)
    .await
    .context("Failed to get session by user and IP")?;

    Ok(row.as_ref().map(row_to_session_sqlite))
}

async fn list_sessions_by_user_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Vec<Session>> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, ip, device, expires_at, last_used_at, created_at
        FROM sessions
        WHERE user_id = ?
        ORDER BY last_used_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list sessions")?;

    Ok(rows.iter().map(row_to_session_sqlite).collect())
}

async fn renew_session_sqlite(
    pool: &SqlitePool,
    id: &str,
    device: &str,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE sessions SET device = ?, expires_at = ?, last_used_at = ? WHERE id = ?")
        .bind(device)
        .bind(expires_at)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to renew session")?;

    Ok(())
}

async fn touch_session_sqlite(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("UPDATE sessions SET last_used_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to touch session")?;

    Ok(())
}

async fn delete_session_sqlite(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete session")?;

    Ok(())
}

async fn delete_other_sessions_sqlite(pool: &SqlitePool, user_id: i64, keep_id: &str) -> Result<i64> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = ? AND id <> ?")
        .bind(user_id)
        .bind(keep_id)
        .execute(pool)
        .await
        .context("Failed to delete other sessions")?;

    Ok(result.rows_affected() as i64)
}

async fn delete_expired_sessions_sqlite(pool: &SqlitePool) -> Result<i64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
        .bind(Utc::now())
        .execute(pool)
        .await
        .context("Failed to delete expired sessions")?;

    Ok(result.rows_affected() as i64)
}

fn row_to_session_sqlite(row: &sqlx::sqlite::SqliteRow) -> Session {
    let device: String = row.get("device");
    Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        ip: row.get("ip"),
        device: parse_device(&device),
        expires_at: row.get("expires_at"),
        last_used_at: row.get("last_used_at"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_session_mysql(pool: &MySqlPool, session: &Session) -> Result<Session> {
    let device = serde_json::to_string(&session.device).context("Failed to encode device")?;

    sqlx::query(
        r#"
        INSERT INTO sessions (id, user_id, ip, device, expires_at, last_used_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(session.user_id)
    .bind(&session.ip)
    .bind(&device)
    .bind(session.expires_at)
    .bind(session.last_used_at)
    .bind(session.created_at)
    .execute(pool)
    .await
    .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_by_id_mysql(pool: &MySqlPool, id: &str) -> Result<Option<Session>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, ip, device, expires_at, last_used_at, created_at
        FROM sessions
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get session by ID")?;

    Ok(row.as_ref().map(row_to_session_mysql))
}

async fn get_session_by_user_and_ip_mysql(
    pool: &MySqlPool,
    user_id: i64,
    ip: &str,
) -> Result<Option<Session>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, ip, device, expires_at, last_used_at, created_at
        FROM sessions
        WHERE user_id = ? AND ip = ?
        "#,
    )
    .bind(user_id)
    .bind(ip)
    .fetch_optional(pool)
    .await
    .context("Failed to get session by user and IP")?;

    Ok(row.as_ref().map(row_to_session_mysql))
}

async fn list_sessions_by_user_mysql(pool: &MySqlPool, user_id: i64) -> Result<Vec<Session>> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, ip, device, expires_at, last_used_at, created_at
        FROM sessions
        WHERE user_id = ?
        ORDER BY last_used_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list sessions")?;

    Ok(rows.iter().map(row_to_session_mysql).collect())
}

async fn renew_session_mysql(
    pool: &MySqlPool,
    id: &str,
    device: &str,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE sessions SET device = ?, expires_at = ?, last_used_at = ? WHERE id = ?")
        .bind(device)
        .bind(expires_at)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to renew session")?;

    Ok(())
}

async fn touch_session_mysql(pool: &MySqlPool, id: &str) -> Result<()> {
    sqlx::query("UPDATE sessions SET last_used_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to touch session")?;

    Ok(())
}

async fn delete_session_mysql(pool: &MySqlPool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete session")?;

    Ok(())
}

async fn delete_other_sessions_mysql(pool: &MySqlPool, user_id: i64, keep_id: &str) -> Result<i64> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = ? AND id <> ?")
        .bind(user_id)
        .bind(keep_id)
        .execute(pool)
        .await
        .context("Failed to delete other sessions")?;

    Ok(result.rows_affected() as i64)
}

async fn delete_expired_sessions_mysql(pool: &MySqlPool) -> Result<i64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
        .bind(Utc::now())
        .execute(pool)
        .await
        .context("Failed to delete expired sessions")?;

    Ok(result.rows_affected() as i64)
}

fn row_to_session_mysql(row: &sqlx::mysql::MySqlRow) -> Session {
    let device: String = row.get("device");
    Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        ip: row.get("ip"),
        device: parse_device(&device),
        expires_at: row.get("expires_at"),
        last_used_at: row.get("last_used_at"),
        created_at: row.get("created_at"),
    }
}
