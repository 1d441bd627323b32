//! Database migrations
//!
//! Migrations are embedded in the binary as SQL strings with one variant per
//! backend, and tracked in the `_migrations` table.
//!
//! ```ignore
//! use educenter::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// All schema migrations, in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_regions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS regions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(55) NOT NULL UNIQUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS regions (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(55) NOT NULL UNIQUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
    Migration {
        version: 2,
        name: "create_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                full_name VARCHAR(55) NOT NULL,
                email VARCHAR(255) NOT NULL UNIQUE,
                phone VARCHAR(20) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'user',
                status VARCHAR(20) NOT NULL DEFAULT 'pending',
                birth_year INTEGER NOT NULL,
                region_id INTEGER,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (region_id) REFERENCES regions(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_users_region_id ON users(region_id);
            CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                full_name VARCHAR(55) NOT NULL,
                email VARCHAR(255) NOT NULL UNIQUE,
                phone VARCHAR(20) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'user',
                status VARCHAR(20) NOT NULL DEFAULT 'pending',
                birth_year INT NOT NULL,
                region_id BIGINT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (region_id) REFERENCES regions(id) ON DELETE SET NULL
            );
            CREATE INDEX idx_users_role ON users(role);
        "#,
    },
    Migration {
        version: 3,
        name: "create_sessions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id INTEGER NOT NULL,
                ip VARCHAR(64) NOT NULL,
                device TEXT NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                last_used_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                UNIQUE (user_id, ip)
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id BIGINT NOT NULL,
                ip VARCHAR(64) NOT NULL,
                device TEXT NOT NULL,
                expires_at DATETIME NOT NULL,
                last_used_at DATETIME NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                UNIQUE KEY uq_sessions_user_ip (user_id, ip)
            );
            CREATE INDEX idx_sessions_expires_at ON sessions(expires_at);
        "#,
    },
    Migration {
        version: 4,
        name: "create_categories",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(55) NOT NULL UNIQUE,
                image VARCHAR(255) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS categories (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(55) NOT NULL UNIQUE,
                image VARCHAR(255) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
    Migration {
        version: 5,
        name: "create_resources",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS resources (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(55) NOT NULL,
                media VARCHAR(255) NOT NULL,
                description TEXT NOT NULL,
                category_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (category_id) REFERENCES categories(id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_resources_category_id ON resources(category_id);
            CREATE INDEX IF NOT EXISTS idx_resources_user_id ON resources(user_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS resources (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(55) NOT NULL,
                media VARCHAR(255) NOT NULL,
                description TEXT NOT NULL,
                category_id BIGINT NOT NULL,
                user_id BIGINT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (category_id) REFERENCES categories(id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
        "#,
    },
    Migration {
        version: 6,
        name: "create_subjects",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS subjects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL UNIQUE,
                image VARCHAR(255) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS subjects (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL UNIQUE,
                image VARCHAR(255) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
    Migration {
        version: 7,
        name: "create_fields",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS fields (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL UNIQUE,
                image VARCHAR(255) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS fields (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL UNIQUE,
                image VARCHAR(255) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
    Migration {
        version: 8,
        name: "create_edu_centers",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS edu_centers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL,
                image VARCHAR(255) NOT NULL,
                phone VARCHAR(20) NOT NULL,
                license VARCHAR(255) NOT NULL,
                address VARCHAR(255),
                region_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (region_id) REFERENCES regions(id),
                FOREIGN KEY (user_id) REFERENCES users(id)
            );
            CREATE INDEX IF NOT EXISTS idx_edu_centers_name ON edu_centers(name);
            CREATE INDEX IF NOT EXISTS idx_edu_centers_region_id ON edu_centers(region_id);
            CREATE INDEX IF NOT EXISTS idx_edu_centers_user_id ON edu_centers(user_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS edu_centers (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL,
                image VARCHAR(255) NOT NULL,
                phone VARCHAR(20) NOT NULL,
                license VARCHAR(255) NOT NULL,
                address VARCHAR(255),
                region_id BIGINT NOT NULL,
                user_id BIGINT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (region_id) REFERENCES regions(id),
                FOREIGN KEY (user_id) REFERENCES users(id)
            );
            CREATE INDEX idx_edu_centers_name ON edu_centers(name);
        "#,
    },
    Migration {
        version: 9,
        name: "create_edu_subjects",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS edu_subjects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                edu_center_id INTEGER NOT NULL,
                subject_id INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (edu_center_id) REFERENCES edu_centers(id) ON DELETE CASCADE,
                FOREIGN KEY (subject_id) REFERENCES subjects(id) ON DELETE CASCADE,
                UNIQUE (edu_center_id, subject_id)
            );
            CREATE INDEX IF NOT EXISTS idx_edu_subjects_subject_id ON edu_subjects(subject_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS edu_subjects (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                edu_center_id BIGINT NOT NULL,
                subject_id BIGINT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (edu_center_id) REFERENCES edu_centers(id) ON DELETE CASCADE,
                FOREIGN KEY (subject_id) REFERENCES subjects(id) ON DELETE CASCADE,
                UNIQUE KEY uq_edu_subjects (edu_center_id, subject_id)
            );
        "#,
    },
    Migration {
        version: 10,
        name: "create_edu_fields",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS edu_fields (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                edu_center_id INTEGER NOT NULL,
                field_id INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (edu_center_id) REFERENCES edu_centers(id) ON DELETE CASCADE,
                FOREIGN KEY (field_id) REFERENCES fields(id) ON DELETE CASCADE,
                UNIQUE (edu_center_id, field_id)
            );
            CREATE INDEX IF NOT EXISTS idx_edu_fields_field_id ON edu_fields(field_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS edu_fields (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                edu_center_id BIGINT NOT NULL,
                field_id BIGINT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (edu_center_id) REFERENCES edu_centers(id) ON DELETE CASCADE,
                FOREIGN KEY (field_id) REFERENCES fields(id) ON DELETE CASCADE,
                UNIQUE KEY uq_edu_fields (edu_center_id, field_id)
            );
        "#,
    },
    Migration {
        version: 11,
        name: "create_branches",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS branches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL,
                image VARCHAR(255) NOT NULL,
                phone VARCHAR(20) NOT NULL,
                location VARCHAR(255) NOT NULL,
                region_id INTEGER NOT NULL,
                edu_center_id INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (region_id) REFERENCES regions(id),
                FOREIGN KEY (edu_center_id) REFERENCES edu_centers(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_branches_edu_center_id ON branches(edu_center_id);
            CREATE INDEX IF NOT EXISTS idx_branches_region_id ON branches(region_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS branches (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL,
                image VARCHAR(255) NOT NULL,
                phone VARCHAR(20) NOT NULL,
                location VARCHAR(255) NOT NULL,
                region_id BIGINT NOT NULL,
                edu_center_id BIGINT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (region_id) REFERENCES regions(id),
                FOREIGN KEY (edu_center_id) REFERENCES edu_centers(id) ON DELETE CASCADE
            );
        "#,
    },
    Migration {
        version: 12,
        name: "create_branch_subjects",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS branch_subjects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                branch_id INTEGER NOT NULL,
                subject_id INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (branch_id) REFERENCES branches(id) ON DELETE CASCADE,
                FOREIGN KEY (subject_id) REFERENCES subjects(id) ON DELETE CASCADE,
                UNIQUE (branch_id, subject_id)
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS branch_subjects (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                branch_id BIGINT NOT NULL,
                subject_id BIGINT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (branch_id) REFERENCES branches(id) ON DELETE CASCADE,
                FOREIGN KEY (subject_id) REFERENCES subjects(id) ON DELETE CASCADE,
                UNIQUE KEY uq_branch_subjects (branch_id, subject_id)
            );
        "#,
    },
    Migration {
        version: 13,
        name: "create_branch_fields",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS branch_fields (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                branch_id INTEGER NOT NULL,
                field_id INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (branch_id) REFERENCES branches(id) ON DELETE CASCADE,
                FOREIGN KEY (field_id) REFERENCES fields(id) ON DELETE CASCADE,
                UNIQUE (branch_id, field_id)
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS branch_fields (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                branch_id BIGINT NOT NULL,
                field_id BIGINT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (branch_id) REFERENCES branches(id) ON DELETE CASCADE,
                FOREIGN KEY (field_id) REFERENCES fields(id) ON DELETE CASCADE,
                UNIQUE KEY uq_branch_fields (branch_id, field_id)
            );
        "#,
    },
    Migration {
        version: 14,
        name: "create_course_registrations",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS course_registrations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                edu_center_id INTEGER NOT NULL,
                branch_id INTEGER NOT NULL,
                subject_id INTEGER NOT NULL,
                field_id INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (edu_center_id) REFERENCES edu_centers(id) ON DELETE CASCADE,
                FOREIGN KEY (branch_id) REFERENCES branches(id) ON DELETE CASCADE,
                FOREIGN KEY (subject_id) REFERENCES subjects(id) ON DELETE CASCADE,
                FOREIGN KEY (field_id) REFERENCES fields(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_course_registrations_user_id ON course_registrations(user_id);
            CREATE INDEX IF NOT EXISTS idx_course_registrations_edu_center_id ON course_registrations(edu_center_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS course_registrations (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                user_id BIGINT NOT NULL,
                edu_center_id BIGINT NOT NULL,
                branch_id BIGINT NOT NULL,
                subject_id BIGINT NOT NULL,
                field_id BIGINT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (edu_center_id) REFERENCES edu_centers(id) ON DELETE CASCADE,
                FOREIGN KEY (branch_id) REFERENCES branches(id) ON DELETE CASCADE,
                FOREIGN KEY (subject_id) REFERENCES subjects(id) ON DELETE CASCADE,
                FOREIGN KEY (field_id) REFERENCES fields(id) ON DELETE CASCADE
            );
        "#,
    },
    Migration {
        version: 15,
        name: "create_comments",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                edu_center_id INTEGER NOT NULL,
                comment VARCHAR(250) NOT NULL,
                star INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (edu_center_id) REFERENCES edu_centers(id) ON DELETE CASCADE,
                CHECK (star >= 0 AND star <= 5)
            );
            CREATE INDEX IF NOT EXISTS idx_comments_edu_center_id ON comments(edu_center_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS comments (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                user_id BIGINT NOT NULL,
                edu_center_id BIGINT NOT NULL,
                comment VARCHAR(250) NOT NULL,
                star INT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (edu_center_id) REFERENCES edu_centers(id) ON DELETE CASCADE
            );
        "#,
    },
    Migration {
        version: 16,
        name: "create_likes",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS likes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                edu_center_id INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (edu_center_id) REFERENCES edu_centers(id) ON DELETE CASCADE,
                UNIQUE (user_id, edu_center_id)
            );
            CREATE INDEX IF NOT EXISTS idx_likes_edu_center_id ON likes(edu_center_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS likes (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                user_id BIGINT NOT NULL,
                edu_center_id BIGINT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (edu_center_id) REFERENCES edu_centers(id) ON DELETE CASCADE,
                UNIQUE KEY uq_likes_user_center (user_id, edu_center_id)
            );
        "#,
    },
];

/// Run all pending migrations.
///
/// # Returns
///
/// Number of migrations applied
///
/// # Errors
///
/// Returns an error if any migration fails to apply
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i32> = applied.iter().map(|m| m.version as i32).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

/// Create the migrations tracking table if it doesn't exist
async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    match pool.driver() {
        DatabaseDriver::Sqlite => get_applied_migrations_sqlite(pool.sqlite()?).await,
        DatabaseDriver::Mysql => get_applied_migrations_mysql(pool.mysql()?).await,
    }
}

async fn get_applied_migrations_sqlite(pool: &SqlitePool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    Ok(rows
        .iter()
        .map(|row| MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect())
}

async fn get_applied_migrations_mysql(pool: &MySqlPool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    Ok(rows
        .iter()
        .map(|row| MigrationRecord {
            version: row.get::<i32, _>("version") as i64,
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect())
}

async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    match pool.driver() {
        DatabaseDriver::Sqlite => apply_migration_sqlite(pool.sqlite()?, migration).await,
        DatabaseDriver::Mysql => apply_migration_mysql(pool.mysql()?, migration).await,
    }
}

async fn apply_migration_sqlite(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin migration")?;

    for statement in split_sql_statements(migration.up_sqlite) {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(&mut *tx)
        .await
        .context("Failed to record migration")?;

    tx.commit().await.context("Failed to commit migration")?;
    Ok(())
}

// MySQL DDL commits implicitly, so statements run one by one on the pool.
async fn apply_migration_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_mysql) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await
        .context("Failed to record migration")?;

    Ok(())
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual statements, dropping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

/// Check if a string contains only SQL comments
fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Check if migrations are up to date
pub async fn is_up_to_date(pool: &DynDatabasePool) -> Result<bool> {
    Ok(pending_count(pool).await? == 0)
}

/// Get pending migrations count
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    Ok(MIGRATIONS.len().saturating_sub(applied.len()))
}

/// Get the total number of migrations defined
pub fn total_migrations() -> usize {
    MIGRATIONS.len()
}

/// Get migration by version
pub fn get_migration(version: i32) -> Option<&'static Migration> {
    MIGRATIONS.iter().find(|m| m.version == version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn migrated_pool() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    async fn insert_region(pool: &SqlitePool, name: &str) -> i64 {
        sqlx::query("INSERT INTO regions (name) VALUES (?)")
            .bind(name)
            .execute(pool)
            .await
            .expect("Failed to insert region")
            .last_insert_rowid()
    }

    async fn insert_user(pool: &SqlitePool, email: &str, phone: &str, region_id: Option<i64>) -> i64 {
        sqlx::query(
            "INSERT INTO users (full_name, email, phone, password_hash, birth_year, region_id) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind("Test User")
        .bind(email)
        .bind(phone)
        .bind("hash")
        .bind(1990)
        .bind(region_id)
        .execute(pool)
        .await
        .expect("Failed to insert user")
        .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, MIGRATIONS.len());

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_is_up_to_date_and_pending_count() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        assert!(!is_up_to_date(&pool).await.expect("Failed to check"));
        assert_eq!(pending_count(&pool).await.expect("Failed to check"), MIGRATIONS.len());

        run_migrations(&pool).await.expect("Failed to run migrations");

        assert!(is_up_to_date(&pool).await.expect("Failed to check"));
        assert_eq!(pending_count(&pool).await.expect("Failed to check"), 0);
    }

    #[tokio::test]
    async fn test_user_email_and_phone_unique() {
        let pool = migrated_pool().await;
        let sqlite = pool.sqlite().expect("sqlite");

        insert_user(sqlite, "a@example.com", "+998901234567", None).await;

        let duplicate_email = sqlx::query(
            "INSERT INTO users (full_name, email, phone, password_hash, birth_year) VALUES ('B', 'a@example.com', '+998900000000', 'h', 1990)",
        )
        .execute(sqlite)
        .await;
        assert!(duplicate_email.is_err());

        let duplicate_phone = sqlx::query(
            "INSERT INTO users (full_name, email, phone, password_hash, birth_year) VALUES ('B', 'b@example.com', '+998901234567', 'h', 1990)",
        )
        .execute(sqlite)
        .await;
        assert!(duplicate_phone.is_err());
    }

    #[tokio::test]
    async fn test_region_delete_sets_user_region_null() {
        let pool = migrated_pool().await;
        let sqlite = pool.sqlite().expect("sqlite");

        let region_id = insert_region(sqlite, "Tashkent").await;
        let user_id = insert_user(sqlite, "a@example.com", "+998901234567", Some(region_id)).await;

        sqlx::query("DELETE FROM regions WHERE id = ?")
            .bind(region_id)
            .execute(sqlite)
            .await
            .expect("Failed to delete region");

        let region: Option<i64> = sqlx::query_scalar("SELECT region_id FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(sqlite)
            .await
            .expect("Failed to read user");
        assert!(region.is_none());
    }

    #[tokio::test]
    async fn test_edu_center_delete_cascades_to_children() {
        let pool = migrated_pool().await;
        let sqlite = pool.sqlite().expect("sqlite");

        let region_id = insert_region(sqlite, "Samarkand").await;
        let user_id = insert_user(sqlite, "ceo@example.com", "+998901234567", Some(region_id)).await;

        let center_id = sqlx::query(
            "INSERT INTO edu_centers (name, image, phone, license, region_id, user_id) VALUES ('Center', 'c.png', '+998901111111', 'L-1', ?, ?)",
        )
        .bind(region_id)
        .bind(user_id)
        .execute(sqlite)
        .await
        .expect("Failed to insert center")
        .last_insert_rowid();

        let subject_id = sqlx::query("INSERT INTO subjects (name, image) VALUES ('Math', 'm.png')")
            .execute(sqlite)
            .await
            .expect("Failed to insert subject")
            .last_insert_rowid();

        sqlx::query("INSERT INTO edu_subjects (edu_center_id, subject_id) VALUES (?, ?)")
            .bind(center_id)
            .bind(subject_id)
            .execute(sqlite)
            .await
            .expect("Failed to link subject");

        sqlx::query(
            "INSERT INTO branches (name, image, phone, location, region_id, edu_center_id) VALUES ('B1', 'b.png', '+998902222222', 'Street 1', ?, ?)",
        )
        .bind(region_id)
        .bind(center_id)
        .execute(sqlite)
        .await
        .expect("Failed to insert branch");

        sqlx::query("INSERT INTO likes (user_id, edu_center_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(center_id)
            .execute(sqlite)
            .await
            .expect("Failed to insert like");

        sqlx::query("DELETE FROM edu_centers WHERE id = ?")
            .bind(center_id)
            .execute(sqlite)
            .await
            .expect("Failed to delete center");

        for table in ["edu_subjects", "branches", "likes"] {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(sqlite)
                .await
                .expect("Failed to count");
            assert_eq!(count, 0, "{} should be empty after cascade", table);
        }
    }

    #[tokio::test]
    async fn test_like_unique_per_user_and_center() {
        let pool = migrated_pool().await;
        let sqlite = pool.sqlite().expect("sqlite");

        let region_id = insert_region(sqlite, "Bukhara").await;
        let user_id = insert_user(sqlite, "u@example.com", "+998901234567", Some(region_id)).await;
        let center_id = sqlx::query(
            "INSERT INTO edu_centers (name, image, phone, license, region_id, user_id) VALUES ('C', 'c.png', '+998901111111', 'L', ?, ?)",
        )
        .bind(region_id)
        .bind(user_id)
        .execute(sqlite)
        .await
        .expect("Failed to insert center")
        .last_insert_rowid();

        let insert = || {
            sqlx::query("INSERT INTO likes (user_id, edu_center_id) VALUES (?, ?)")
                .bind(user_id)
                .bind(center_id)
                .execute(sqlite)
        };

        assert!(insert().await.is_ok());
        assert!(insert().await.is_err());
    }

    #[tokio::test]
    async fn test_comment_star_check_constraint() {
        let pool = migrated_pool().await;
        let sqlite = pool.sqlite().expect("sqlite");

        let region_id = insert_region(sqlite, "Khiva").await;
        let user_id = insert_user(sqlite, "u@example.com", "+998901234567", Some(region_id)).await;
        let center_id = sqlx::query(
            "INSERT INTO edu_centers (name, image, phone, license, region_id, user_id) VALUES ('C', 'c.png', '+998901111111', 'L', ?, ?)",
        )
        .bind(region_id)
        .bind(user_id)
        .execute(sqlite)
        .await
        .expect("Failed to insert center")
        .last_insert_rowid();

        let result = sqlx::query(
            "INSERT INTO comments (user_id, edu_center_id, comment, star) VALUES (?, ?, 'Too good', 6)",
        )
        .bind(user_id)
        .bind(center_id)
        .execute(sqlite)
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_get_migration() {
        assert_eq!(get_migration(1).map(|m| m.name), Some("create_regions"));
        assert!(get_migration(999).is_none());
    }

    #[test]
    fn test_migration_versions_are_sequential() {
        for (idx, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, idx + 1);
        }
        assert_eq!(total_migrations(), 16);
    }

    #[test]
    fn test_split_sql_statements() {
        let sql = "CREATE TABLE a (id INT); CREATE TABLE b (id INT);";
        assert_eq!(split_sql_statements(sql).len(), 2);

        let sql_with_comments = "-- Comment\nCREATE TABLE a (id INT);\n-- trailing";
        assert_eq!(split_sql_statements(sql_with_comments).len(), 1);
    }

    #[test]
    fn test_is_comment_only() {
        assert!(is_comment_only("-- This is a comment"));
        assert!(is_comment_only("-- Line 1\n-- Line 2"));
        assert!(!is_comment_only("CREATE TABLE test"));
        assert!(!is_comment_only("-- Comment\nCREATE TABLE test"));
    }
}
