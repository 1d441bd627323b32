//! Region repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ListParams, Region, RegionSort};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Region repository trait
#[async_trait]
pub trait RegionRepository: Send + Sync {
    async fn create(&self, name: &str) -> Result<Region>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Region>>;

    async fn update(&self, id: i64, name: &str) -> Result<Region>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// Number of centers and branches located in the region
    async fn count_references(&self, id: i64) -> Result<i64>;

    /// List regions, searching by name
    async fn list(&self, params: &ListParams<RegionSort>) -> Result<(Vec<Region>, i64)>;
}

/// SQLx-based region repository implementation
pub struct SqlxRegionRepository {
    pool: DynDatabasePool,
}

impl SqlxRegionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn RegionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl RegionRepository for SqlxRegionRepository {
    async fn create(&self, name: &str) -> Result<Region> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_region_sqlite(self.pool.sqlite()?, name).await,
            DatabaseDriver::Mysql => create_region_mysql(self.pool.mysql()?, name).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Region>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_region_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_region_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn update(&self, id: i64, name: &str) -> Result<Region> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_region_sqlite(self.pool.sqlite()?, id, name).await,
            DatabaseDriver::Mysql => update_region_mysql(self.pool.mysql()?, id, name).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("DELETE FROM regions WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to delete region")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query("DELETE FROM regions WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to delete region")?;
            }
        }
        Ok(())
    }

    async fn count_references(&self, id: i64) -> Result<i64> {
        let sql = r#"
            SELECT (SELECT COUNT(*) FROM edu_centers WHERE region_id = ?)
                 + (SELECT COUNT(*) FROM branches WHERE region_id = ?) AS count
        "#;
        let row = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .bind(id)
                    .fetch_one(self.pool.sqlite()?)
                    .await
                    .context("Failed to count region references")?;
                row.get::<i64, _>("count")
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .bind(id)
                    .fetch_one(self.pool.mysql()?)
                    .await
                    .context("Failed to count region references")?;
                row.get::<i64, _>("count")
            }
        };
        Ok(row)
    }

    async fn list(&self, params: &ListParams<RegionSort>) -> Result<(Vec<Region>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_regions_sqlite(self.pool.sqlite()?, params).await,
            DatabaseDriver::Mysql => list_regions_mysql(self.pool.mysql()?, params).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_region_sqlite(pool: &SqlitePool, name: &str) -> Result<Region> {
    let now = Utc::now();
    let result = sqlx::query("INSERT INTO regions (name, created_at, updated_at) VALUES (?, ?, ?)")
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create region")?;

    Ok(Region {
        id: result.last_insert_rowid(),
        name: name.to_string(),
        created_at: now,
        updated_at: now,
    })
}

async fn get_region_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Region>> {
    let row = sqlx::query("SELECT id, name, created_at, updated_at FROM regions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get region by ID")?;

    Ok(row.as_ref().map(row_to_region_sqlite))
}

async fn update_region_sqlite(pool: &SqlitePool, id: i64, name: &str) -> Result<Region> {
    sqlx::query("UPDATE regions SET name = ?, updated_at = ? WHERE id = ?")
        .bind(name)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update region")?;

    get_region_by_id_sqlite(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Region not found after update"))
}

async fn list_regions_sqlite(
    pool: &SqlitePool,
    params: &ListParams<RegionSort>,
) -> Result<(Vec<Region>, i64)> {
    let pattern = params.contains_pattern();
    let sql = format!(
        r#"
        SELECT id, name, created_at, updated_at FROM regions
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
        .context("Failed to list regions")?;

    let total: i64 = sqlx::query(
        r#"SELECT COUNT(*) as count FROM regions WHERE (? IS NULL OR name LIKE ? ESCAPE '\')"#,
    )
    .bind(&pattern)
    .bind(&pattern)
    .fetch_one(pool)
    .await
    .context("Failed to count regions")?
    .get("count");

    Ok((rows.iter().map(row_to_region_sqlite).collect(), total))
}

fn row_to_region_sqlite(row: &sqlx::sqlite::SqliteRow) -> Region {
    Region {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_region_mysql(pool: &MySqlPool, name: &str) -> Result<Region> {
    let now = Utc::now();
    let result = sqlx::query("INSERT INTO regions (name, created_at, updated_at) VALUES (?, ?, ?)")
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create region")?;

    Ok(Region {
        id: result.last_insert_id() as i64,
        name: name.to_string(),
        created_at: now,
        updated_at: now,
    })
}

async fn get_region_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Region>> {
    let row = sqlx::query("SELECT id, name, created_at, updated_at FROM regions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get region by ID")?;

    Ok(row.as_ref().map(row_to_region_mysql))
}

async fn update_region_mysql(pool: &MySqlPool, id: i64, name: &str) -> Result<Region> {
    sqlx::query("UPDATE regions SET name = ?, updated_at = ? WHERE id = ?")
        .bind(name)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update region")?;

    get_region_by_id_mysql(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Region not found after update"))
}

async fn list_regions_mysql(
    pool: &MySqlPool,
    params: &ListParams<RegionSort>,
) -> Result<(Vec<Region>, i64)> {
    let pattern = params.contains_pattern();
    let sql = format!(
        r#"
        SELECT id, name, created_at, updated_at FROM regions
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
        .context("Failed to list regions")?;

    let total: i64 =
        sqlx::query("SELECT COUNT(*) as count FROM regions WHERE (? IS NULL OR name LIKE ?)")
            .bind(&pattern)
            .bind(&pattern)
            .fetch_one(pool)
            .await
            .context("Failed to count regions")?
            .get("count");

    Ok((rows.iter().map(row_to_region_mysql).collect(), total))
}

fn row_to_region_mysql(row: &sqlx::mysql::MySqlRow) -> Region {
    Region {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_center, insert_user, migrated_pool};
    use crate::models::SortOrder;

    async fn setup_test_repo() -> (DynDatabasePool, SqlxRegionRepository) {
        let pool = migrated_pool().await;
        let repo = SqlxRegionRepository::new(pool.clone());
        (pool, repo)
    }

    #[tokio::test]
    async fn test_create_get_update_delete_region() {
        let (_pool, repo) = setup_test_repo().await;

        let created = repo.create("Tashkent").await.expect("Failed to create region");
        assert!(created.id > 0);

        let updated = repo
            .update(created.id, "Tashkent city")
            .await
            .expect("Failed to update region");
        assert_eq!(updated.name, "Tashkent city");

        repo.delete(created.id).await.expect("Failed to delete region");
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_region_name_unique() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create("Fergana").await.unwrap();

        let result = repo.create("Fergana").await;
        assert!(result.as_ref().is_err_and(crate::db::is_unique_violation));
    }

    #[tokio::test]
    async fn test_count_references() {
        let (pool, repo) = setup_test_repo().await;
        let region = repo.create("Andijan").await.unwrap();
        assert_eq!(repo.count_references(region.id).await.unwrap(), 0);

        let owner = insert_user(&pool, 1, "ceo").await;
        insert_center(&pool, "Center", region.id, owner).await;
        assert_eq!(repo.count_references(region.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_regions_search_and_sort() {
        let (_pool, repo) = setup_test_repo().await;
        for name in ["Samarkand", "Bukhara", "Surxondaryo", "Navoi"] {
            repo.create(name).await.unwrap();
        }

        let params = ListParams::new(1, 10)
            .with_search(Some("s".into()))
            .with_sort(RegionSort::Name, SortOrder::Asc);
        let (regions, total) = repo.list(&params).await.expect("Failed to list regions");
        assert_eq!(total, 2);
        assert_eq!(regions[0].name, "Samarkand");
        assert_eq!(regions[1].name, "Surxondaryo");

        let (empty, total) = repo
            .list(&ListParams::new(1, 10).with_search(Some("zzz".into())))
            .await
            .unwrap();
        assert!(empty.is_empty());
        assert_eq!(total, 0);
    }
}
