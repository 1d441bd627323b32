//! Database layer
//!
//! Database abstraction for the education center directory. Two backends are
//! supported:
//! - SQLite (default, single-file deployment)
//! - MySQL (for larger deployments)
//!
//! The driver is selected from configuration. Repositories match on
//! [`DatabasePool::driver`] and run backend-specific SQL.
//!
//! # Usage
//!
//! ```ignore
//! use educenter::config::DatabaseConfig;
//! use educenter::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};

/// Whether an error chain contains a unique constraint violation.
///
/// Repositories return `anyhow::Error`; services use this to turn duplicate
/// inserts into conflicts instead of internal errors.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .map(|db| db.is_unique_violation())
            .unwrap_or(false)
    })
}

/// Whether an error chain contains a foreign key violation.
pub fn is_foreign_key_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .map(|db| db.is_foreign_key_violation())
            .unwrap_or(false)
    })
}
