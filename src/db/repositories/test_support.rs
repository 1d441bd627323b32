//! Fixtures shared by repository tests

use chrono::Utc;

use super::{SqlxUserRepository, UserRepository};
use crate::db::{create_test_pool, migrations, DynDatabasePool};
use crate::models::User;

pub async fn migrated_pool() -> DynDatabasePool {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

pub async fn insert_region(pool: &DynDatabasePool, name: &str) -> i64 {
    let now = Utc::now();
    sqlx::query("INSERT INTO regions (name, created_at, updated_at) VALUES (?, ?, ?)")
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(pool.sqlite().expect("sqlite"))
        .await
        .expect("Failed to insert region")
        .last_insert_rowid()
}

/// Insert an active user; `n` keeps email and phone unique
pub async fn insert_user(pool: &DynDatabasePool, n: u32, role: &str) -> i64 {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO users (full_name, email, phone, password_hash, role, status, birth_year, created_at, updated_at)
        VALUES (?, ?, ?, 'hash', ?, 'active', 1990, ?, ?)
        "#,
    )
    .bind(format!("User {}", n))
    .bind(format!("user{}@example.com", n))
    .bind(format!("+998{:09}", n))
    .bind(role)
    .bind(now)
    .bind(now)
    .execute(pool.sqlite().expect("sqlite"))
    .await
    .expect("Failed to insert user")
    .last_insert_rowid()
}

/// Insert a subject or field row into `table`
pub async fn insert_catalog_item(pool: &DynDatabasePool, table: &str, name: &str) -> i64 {
    let now = Utc::now();
    sqlx::query(&format!(
        "INSERT INTO {} (name, image, created_at, updated_at) VALUES (?, ?, ?, ?)",
        table
    ))
    .bind(name)
    .bind(format!("/uploads/{}/{}.png", table, name))
    .bind(now)
    .bind(now)
    .execute(pool.sqlite().expect("sqlite"))
    .await
    .expect("Failed to insert catalog item")
    .last_insert_rowid()
}

pub async fn insert_center(pool: &DynDatabasePool, name: &str, region_id: i64, user_id: i64) -> i64 {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO edu_centers (name, image, phone, license, address, region_id, user_id, created_at, updated_at)
        VALUES (?, '/uploads/c.png', '+998712000000', 'LIC-1', NULL, ?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(region_id)
    .bind(user_id)
    .bind(now)
    .bind(now)
    .execute(pool.sqlite().expect("sqlite"))
    .await
    .expect("Failed to insert center")
    .last_insert_rowid()
}

pub async fn insert_branch(pool: &DynDatabasePool, name: &str, region_id: i64, center_id: i64) -> i64 {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO branches (name, image, phone, location, region_id, edu_center_id, created_at, updated_at)
        VALUES (?, '/uploads/b.png', '+998712000001', 'Main street', ?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(region_id)
    .bind(center_id)
    .bind(now)
    .bind(now)
    .execute(pool.sqlite().expect("sqlite"))
    .await
    .expect("Failed to insert branch")
    .last_insert_rowid()
}

/// Link a center to a subject/field through `table` (`edu_subjects`, ...)
pub async fn link_center(pool: &DynDatabasePool, table: &str, column: &str, center_id: i64, item_id: i64) {
    sqlx::query(&format!(
        "INSERT INTO {} (edu_center_id, {}, created_at) VALUES (?, ?, ?)",
        table, column
    ))
    .bind(center_id)
    .bind(item_id)
    .bind(Utc::now())
    .execute(pool.sqlite().expect("sqlite"))
    .await
    .expect("Failed to link center");
}

/// Insert an active user and load it back as a model
pub async fn insert_user_model(pool: &DynDatabasePool, n: u32, role: &str) -> User {
    let id = insert_user(pool, n, role).await;
    SqlxUserRepository::new(pool.clone())
        .get_by_id(id)
        .await
        .expect("Failed to load user")
        .expect("User missing after insert")
}
