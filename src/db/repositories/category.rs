//! Category repository
//!
//! Database operations for resource categories.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Category, CategorySort, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, name: &str, image: &str) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Write name and image of an existing category
    async fn update(&self, category: &Category) -> Result<Category>;

    /// Delete a category
    async fn delete(&self, id: i64) -> Result<()>;

    /// Number of resources filed under the category
    async fn count_resources(&self, id: i64) -> Result<i64>;

    /// List categories, searching by name
    async fn list(&self, params: &ListParams<CategorySort>) -> Result<(Vec<Category>, i64)>;
}

/// SQLx-based category repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, name: &str, image: &str) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_category_sqlite(self.pool.sqlite()?, name, image).await,
            DatabaseDriver::Mysql => create_category_mysql(self.pool.mysql()?, name, image).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_category_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_category_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn update(&self, category: &Category) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_category_sqlite(self.pool.sqlite()?, category).await,
            DatabaseDriver::Mysql => update_category_mysql(self.pool.mysql()?, category).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_category_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => delete_category_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn count_resources(&self, id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) as count FROM resources WHERE category_id = ?";
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to count category resources")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to count category resources")?
                .get("count"),
        };
        Ok(count)
    }

    async fn list(&self, params: &ListParams<CategorySort>) -> Result<(Vec<Category>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_categories_sqlite(self.pool.sqlite()?, params).await,
            DatabaseDriver::Mysql => list_categories_mysql(self.pool.mysql()?, params).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(pool: &SqlitePool, name: &str, image: &str) -> Result<Category> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO categories (name, image, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(image)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_rowid(),
        name: name.to_string(),
        image: image.to_string(),
        created_at: now,
        updated_at: now,
    })
}

async fn get_category_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, image, created_at, updated_at
        FROM categories
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get category by ID")?;

    Ok(row.as_ref().map(row_to_category_sqlite))
}

async fn update_category_sqlite(pool: &SqlitePool, category: &Category) -> Result<Category> {
    sqlx::query("UPDATE categories SET name = ?, image = ?, updated_at = ? WHERE id = ?")
        .bind(&category.name)
        .bind(&category.image)
        .bind(Utc::now())
        .bind(category.id)
        .execute(pool)
        .await
        .context("Failed to update category")?;

    get_category_by_id_sqlite(pool, category.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Category not found after update"))
}

async fn delete_category_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(())
}

async fn list_categories_sqlite(
    pool: &SqlitePool,
    params: &ListParams<CategorySort>,
) -> Result<(Vec<Category>, i64)> {
    let pattern = params.contains_pattern();
    let sql = format!(
        r#"
        SELECT id, name, image, created_at, updated_at FROM categories
        WHERE (? IS NULL OR name LIKE ? ESCAPE '\')
        ORDER BY {} LIMIT ? OFFSET ?
        "#,
        params.order_by()
    );
    let rows = sqlx::query(&sql)
        .bind(&pattern)
        .bind(&pattern)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    let total: i64 = sqlx::query(
        r#"SELECT COUNT(*) as count FROM categories WHERE (? IS NULL OR name LIKE ? ESCAPE '\')"#,
    )
    .bind(&pattern)
    .bind(&pattern)
    .fetch_one(pool)
    .await
    .context("Failed to count categories")?
    .get("count");

    Ok((rows.iter().map(row_to_category_sqlite).collect(), total))
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        image: row.get("image"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_category_mysql(pool: &MySqlPool, name: &str, image: &str) -> Result<Category> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO categories (name, image, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(image)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_id() as i64,
        name: name.to_string(),
        image: image.to_string(),
        created_at: now,
        updated_at: now,
    })
}

async fn get_category_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, image, created_at, updated_at
        FROM categories
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get category by ID")?;

    Ok(row.as_ref().map(row_to_category_mysql))
}

async fn update_category_mysql(pool: &MySqlPool, category: &Category) -> Result<Category> {
    sqlx::query("UPDATE categories SET name = ?, image = ?, updated_at = ? WHERE id = ?")
        .bind(&category.name)
        .bind(&category.image)
        .bind(Utc::now())
        .bind(category.id)
        .execute(pool)
        .await
        .context("Failed to update category")?;

    get_category_by_id_mysql(pool, category.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Category not found after update"))
}

async fn delete_category_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(())
}

async fn list_categories_mysql(
    pool: &MySqlPool,
    params: &ListParams<CategorySort>,
) -> Result<(Vec<Category>, i64)> {
    let pattern = params.contains_pattern();
    let sql = format!(
        r#"
        SELECT id, name, image, created_at, updated_at FROM categories
        WHERE (? IS NULL OR name LIKE ?)
        ORDER BY {} LIMIT ? OFFSET ?
        "#,
        params.order_by()
    );
    let rows = sqlx::query(&sql)
        .bind(&pattern)
        .bind(&pattern)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    let total: i64 =
        sqlx::query("SELECT COUNT(*) as count FROM categories WHERE (? IS NULL OR name LIKE ?)")
            .bind(&pattern)
            .bind(&pattern)
            .fetch_one(pool)
            .await
            .context("Failed to count categories")?
            .get("count");

    Ok((rows.iter().map(row_to_category_mysql).collect(), total))
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        image: row.get("image"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_user, migrated_pool};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxCategoryRepository) {
        let pool = migrated_pool().await;
        let repo = SqlxCategoryRepository::new(pool.clone());
        (pool, repo)
    }

    #[tokio::test]
    async fn test_create_category() {
        let (_pool, repo) = setup_test_repo().await;

        let created = repo
            .create("Books", "/uploads/books.png")
            .await
            .expect("Failed to create category");

        assert!(created.id > 0);
        assert_eq!(created.name, "Books");
        assert_eq!(created.image, "/uploads/books.png");
    }

    #[tokio::test]
    async fn test_update_category() {
        let (_pool, repo) = setup_test_repo().await;
        let mut category = repo.create("Video", "/uploads/v.png").await.unwrap();

        category.name = "Videos".to_string();
        let updated = repo.update(&category).await.expect("Failed to update category");

        assert_eq!(updated.name, "Videos");
        assert_eq!(updated.image, "/uploads/v.png");
    }

    #[tokio::test]
    async fn test_category_name_unique() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create("Notes", "/uploads/n.png").await.unwrap();

        let result = repo.create("Notes", "/uploads/n2.png").await;
        assert!(result.as_ref().is_err_and(crate::db::is_unique_violation));
    }

    #[tokio::test]
    async fn test_count_resources_blocks_delete() {
        let (pool, repo) = setup_test_repo().await;
        let category = repo.create("Audio", "/uploads/a.png").await.unwrap();
        let user_id = insert_user(&pool, 1, "user").await;

        sqlx::query(
            "INSERT INTO resources (name, media, description, category_id, user_id, created_at, updated_at) VALUES ('Podcast', '/m.mp3', 'd', ?, ?, ?, ?)",
        )
        .bind(category.id)
        .bind(user_id)
        .bind(Utc::now())
        .bind(Utc::now())
        .execute(pool.sqlite().unwrap())
        .await
        .unwrap();

        assert_eq!(repo.count_resources(category.id).await.unwrap(), 1);

        let result = repo.delete(category.id).await;
        assert!(result.as_ref().is_err_and(crate::db::is_foreign_key_violation));
    }

    #[tokio::test]
    async fn test_list_categories_pagination() {
        let (_pool, repo) = setup_test_repo().await;
        for i in 0..5 {
            repo.create(&format!("Category {}", i), "/uploads/c.png")
                .await
                .unwrap();
        }

        let (page, total) = repo.list(&ListParams::new(2, 2)).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].name, "Category 2");
    }
}
