//! Resource repository
//!
//! Resources are always read joined with their author and category so list
//! and detail responses carry display names.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ListParams, NewResource, Resource, ResourceFilter, ResourceSort};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait ResourceRepository: Send + Sync {
    async fn create(&self, input: &NewResource) -> Result<Resource>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Resource>>;

    /// Write the editable columns of a resource
    async fn update(&self, resource: &Resource) -> Result<Resource>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn list(
        &self,
        filter: &ResourceFilter,
        params: &ListParams<ResourceSort>,
    ) -> Result<(Vec<Resource>, i64)>;
}

/// SQLx-based resource repository implementation
pub struct SqlxResourceRepository {
    pool: DynDatabasePool,
}

impl SqlxResourceRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ResourceRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ResourceRepository for SqlxResourceRepository {
    async fn create(&self, input: &NewResource) -> Result<Resource> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_resource_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => create_resource_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Resource>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_resource_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_resource_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn update(&self, resource: &Resource) -> Result<Resource> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_resource_sqlite(self.pool.sqlite()?, resource).await,
            DatabaseDriver::Mysql => update_resource_mysql(self.pool.mysql()?, resource).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("DELETE FROM resources WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to delete resource")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query("DELETE FROM resources WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to delete resource")?;
            }
        }
        Ok(())
    }

    async fn list(
        &self,
        filter: &ResourceFilter,
        params: &ListParams<ResourceSort>,
    ) -> Result<(Vec<Resource>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_resources_sqlite(self.pool.sqlite()?, filter, params).await
            }
            DatabaseDriver::Mysql => list_resources_mysql(self.pool.mysql()?, filter, params).await,
        }
    }
}

const RESOURCE_SELECT: &str = r#"
    SELECT r.id, r.name, r.media, r.description, r.category_id, r.user_id,
           c.name AS category_name, u.full_name AS user_full_name,
           r.created_at, r.updated_at
    FROM resources r
    JOIN categories c ON c.id = r.category_id
    JOIN users u ON u.id = r.user_id
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_resource_sqlite(pool: &SqlitePool, input: &NewResource) -> Result<Resource> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO resources (name, media, description, category_id, user_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.name)
    .bind(&input.media)
    .bind(&input.description)
    .bind(input.category_id)
    .bind(input.user_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create resource")?;

    get_resource_by_id_sqlite(pool, result.last_insert_rowid())
        .await?
        .ok_or_else(|| anyhow::anyhow!("Resource not found after insert"))
}

async fn get_resource_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Resource>> {
    let sql = format!("{} WHERE r.id = ?", RESOURCE_SELECT);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get resource by ID")?;

    Ok(row.as_ref().map(row_to_resource_sqlite))
}

async fn update_resource_sqlite(pool: &SqlitePool, resource: &Resource) -> Result<Resource> {
    sqlx::query(
        r#"
        UPDATE resources
        SET name = ?, media = ?, description = ?, category_id = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&resource.name)
    .bind(&resource.media)
    .bind(&resource.description)
    .bind(resource.category_id)
    .bind(Utc::now())
    .bind(resource.id)
    .execute(pool)
    .await
    .context("Failed to update resource")?;

    get_resource_by_id_sqlite(pool, resource.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Resource not found after update"))
}

async fn list_resources_sqlite(
    pool: &SqlitePool,
    filter: &ResourceFilter,
    params: &ListParams<ResourceSort>,
) -> Result<(Vec<Resource>, i64)> {
    let where_clause = r#"
        WHERE (? IS NULL OR r.category_id = ?)
          AND (? IS NULL OR r.user_id = ?)
          AND (? IS NULL OR r.name LIKE ? ESCAPE '\' OR r.description LIKE ? ESCAPE '\')
    "#;
    let pattern = params.contains_pattern();

    let sql = format!(
        "{} {} ORDER BY {} LIMIT ? OFFSET ?",
        RESOURCE_SELECT,
        where_clause,
        params.order_by()
    );
    let rows = sqlx::query(&sql)
        .bind(filter.category_id)
        .bind(filter.category_id)
        .bind(filter.user_id)
        .bind(filter.user_id)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list resources")?;

    let count_sql = format!("SELECT COUNT(*) as count FROM resources r {}", where_clause);
    let total: i64 = sqlx::query(&count_sql)
        .bind(filter.category_id)
        .bind(filter.category_id)
        .bind(filter.user_id)
        .bind(filter.user_id)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_one(pool)
        .await
        .context("Failed to count resources")?
        .get("count");

    Ok((rows.iter().map(row_to_resource_sqlite).collect(), total))
}

fn row_to_resource_sqlite(row: &sqlx::sqlite::SqliteRow) -> Resource {
    Resource {
        id: row.get("id"),
        name: row.get("name"),
        media: row.get("media"),
        description: row.get("description"),
        category_id: row.get("category_id"),
        user_id: row.get("user_id"),
        category_name: row.get("category_name"),
        user_full_name: row.get("user_full_name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_resource_mysql(pool: &MySqlPool, input: &NewResource) -> Result<Resource> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO resources (name, media, description, category_id, user_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.name)
    .bind(&input.media)
    .bind(&input.description)
    .bind(input.category_id)
    .bind(input.user_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create resource")?;

    get_resource_by_id_mysql(pool, result.last_insert_id() as i64)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Resource not found after insert"))
}

async fn get_resource_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Resource>> {
    let sql = format!("{} WHERE r.id = ?", RESOURCE_SELECT);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get resource by ID")?;

    Ok(row.as_ref().map(row_to_resource_mysql))
}

async fn update_resource_mysql(pool: &MySqlPool, resource: &Resource) -> Result<Resource> {
    sqlx::query(
        r#"
        UPDATE resources
        SET name = ?, media = ?, description = ?, category_id = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&resource.name)
    .bind(&resource.media)
    .bind(&resource.description)
    .bind(resource.category_id)
    .bind(Utc::now())
    .bind(resource.id)
    .execute(pool)
    .await
    .context("Failed to update resource")?;

    get_resource_by_id_mysql(pool, resource.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Resource not found after update"))
}

async fn list_resources_mysql(
    pool: &MySqlPool,
    filter: &ResourceFilter,
    params: &ListParams<ResourceSort>,
) -> Result<(Vec<Resource>, i64)> {
    let where_clause = r#"
        WHERE (? IS NULL OR r.category_id = ?)
          AND (? IS NULL OR r.user_id = ?)
          AND (? IS NULL OR r.name LIKE ? OR r.description LIKE ?)
    "#;
    let pattern = params.contains_pattern();

    let sql = format!(
        "{} {} ORDER BY {} LIMIT ? OFFSET ?",
        RESOURCE_SELECT,
        where_clause,
        params.order_by()
    );
    let rows = sqlx::query(&sql)
        .bind(filter.category_id)
        .bind(filter.category_id)
        .bind(filter.user_id)
        .bind(filter.user_id)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list resources")?;

    let count_sql = format!("SELECT COUNT(*) as count FROM resources r {}", where_clause);
    let total: i64 = sqlx::query(&count_sql)
        .bind(filter.category_id)
        .bind(filter.category_id)
        .bind(filter.user_id)
        .bind(filter.user_id)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_one(pool)
        .await
        .context("Failed to count resources")?
        .get("count");

    Ok((rows.iter().map(row_to_resource_mysql).collect(), total))
}

fn row_to_resource_mysql(row: &sqlx::mysql::MySqlRow) -> Resource {
    Resource {
        id: row.get("id"),
        name: row.get("name"),
        media: row.get("media"),
        description: row.get("description"),
        category_id: row.get("category_id"),
        user_id: row.get("user_id"),
        category_name: row.get("category_name"),
        user_full_name: row.get("user_full_name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
