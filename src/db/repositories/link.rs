//! Center link repository
//!
//! Rows of `edu_subjects` / `edu_fields`: which subjects and fields an
//! education center offers.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CatalogKind, EduLink, LinkFilter, LinkSort, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait LinkRepository: Send + Sync {
    fn kind(&self) -> CatalogKind;

    async fn create(&self, edu_center_id: i64, item_id: i64) -> Result<EduLink>;

    async fn get_by_id(&self, id: i64) -> Result<Option<EduLink>>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// Whether the center offers the item
    async fn exists(&self, edu_center_id: i64, item_id: i64) -> Result<bool>;

    async fn list(
        &self,
        filter: &LinkFilter,
        params: &ListParams<LinkSort>,
    ) -> Result<(Vec<EduLink>, i64)>;
}

/// SQLx-based link repository implementation
pub struct SqlxLinkRepository {
    pool: DynDatabasePool,
    kind: CatalogKind,
}

impl SqlxLinkRepository {
    pub fn new(pool: DynDatabasePool, kind: CatalogKind) -> Self {
        Self { pool, kind }
    }

    pub fn boxed(pool: DynDatabasePool, kind: CatalogKind) -> Arc<dyn LinkRepository> {
        Arc::new(Self::new(pool, kind))
    }

    fn select_sql(&self) -> String {
        format!(
            r#"
            SELECT l.id, l.edu_center_id, l.{col} AS item_id, i.name AS item_name,
                   c.name AS edu_center_name, l.created_at
            FROM {link} l
            JOIN {table} i ON i.id = l.{col}
            JOIN edu_centers c ON c.id = l.edu_center_id
            "#,
            col = self.kind.id_column(),
            link = self.kind.center_link_table(),
            table = self.kind.table(),
        )
    }

    fn where_sql(&self) -> String {
        format!(
            "WHERE (? IS NULL OR l.edu_center_id = ?) AND (? IS NULL OR l.{} = ?)",
            self.kind.id_column()
        )
    }
}

#[async_trait]
impl LinkRepository for SqlxLinkRepository {
    fn kind(&self) -> CatalogKind {
        self.kind
    }

    async fn create(&self, edu_center_id: i64, item_id: i64) -> Result<EduLink> {
        let sql = format!(
            "INSERT INTO {} (edu_center_id, {}, created_at) VALUES (?, ?, ?)",
            self.kind.center_link_table(),
            self.kind.id_column()
        );
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(edu_center_id)
                .bind(item_id)
                .bind(Utc::now())
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to create center link")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(edu_center_id)
                .bind(item_id)
                .bind(Utc::now())
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to create center link")?
                .last_insert_id() as i64,
        };

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Center link not found after insert"))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<EduLink>> {
        let sql = format!("{} WHERE l.id = ?", self.select_sql());
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get center link")?;
                Ok(row.as_ref().map(|r| row_to_link_sqlite(r, self.kind)))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get center link")?;
                Ok(row.as_ref().map(|r| row_to_link_mysql(r, self.kind)))
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?", self.kind.center_link_table());
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(&sql)
                    .bind(id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to delete center link")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(&sql)
                    .bind(id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to delete center link")?;
            }
        }
        Ok(())
    }

    async fn exists(&self, edu_center_id: i64, item_id: i64) -> Result<bool> {
        let sql = format!(
            "SELECT COUNT(*) as count FROM {} WHERE edu_center_id = ? AND {} = ?",
            self.kind.center_link_table(),
            self.kind.id_column()
        );
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(edu_center_id)
                .bind(item_id)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to check center link")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(edu_center_id)
                .bind(item_id)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to check center link")?
                .get("count"),
        };
        Ok(count > 0)
    }

    async fn list(
        &self,
        filter: &LinkFilter,
        params: &ListParams<LinkSort>,
    ) -> Result<(Vec<EduLink>, i64)> {
        let sql = format!(
            "{} {} ORDER BY {} LIMIT ? OFFSET ?",
            self.select_sql(),
            self.where_sql(),
            params.order_by()
        );
        let count_sql = format!(
            "SELECT COUNT(*) as count FROM {} l {}",
            self.kind.center_link_table(),
            self.where_sql()
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_links_sqlite(self.pool.sqlite()?, self.kind, &sql, &count_sql, filter, params)
                    .await
            }
            DatabaseDriver::Mysql => {
                list_links_mysql(self.pool.mysql()?, self.kind, &sql, &count_sql, filter, params)
                    .await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn list_links_sqlite(
    pool: &SqlitePool,
    kind: CatalogKind,
    sql: &str,
    count_sql: &str,
    filter: &LinkFilter,
    params: &ListParams<LinkSort>,
) -> Result<(Vec<EduLink>, i64)> {
    let rows = sqlx::query(sql)
        .bind(filter.edu_center_id)
        .bind(filter.edu_center_id)
        .bind(filter.item_id)
        .bind(filter.item_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list center links")?;

    let total: i64 = sqlx::query(count_sql)
        .bind(filter.edu_center_id)
        .bind(filter.edu_center_id)
        .bind(filter.item_id)
        .bind(filter.item_id)
        .fetch_one(pool)
        .await
        .context("Failed to count center links")?
        .get("count");

    Ok((rows.iter().map(|r| row_to_link_sqlite(r, kind)).collect(), total))
}

fn row_to_link_sqlite(row: &sqlx::sqlite::SqliteRow, kind: CatalogKind) -> EduLink {
    EduLink::new(
        kind,
        row.get("id"),
        row.get("edu_center_id"),
        row.get("item_id"),
        row.get("item_name"),
        row.get("edu_center_name"),
        row.get("created_at"),
    )
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn list_links_mysql(
    pool: &MySqlPool,
    kind: CatalogKind,
    sql: &str,
    count_sql: &str,
    filter: &LinkFilter,
    params: &ListParams<LinkSort>,
) -> Result<(Vec<EduLink>, i64)> {
    let rows = sqlx::query(sql)
        .bind(filter.edu_center_id)
        .bind(filter.edu_center_id)
        .bind(filter.item_id)
        .bind(filter.item_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list center links")?;

    let total: i64 = sqlx::query(count_sql)
        .bind(filter.edu_center_id)
        .bind(filter.edu_center_id)
        .bind(filter.item_id)
        .bind(filter.item_id)
        .fetch_one(pool)
        .await
        .context("Failed to count center links")?
        .get("count");

    Ok((rows.iter().map(|r| row_to_link_mysql(r, kind)).collect(), total))
}

fn row_to_link_mysql(row: &sqlx::mysql::MySqlRow, kind: CatalogKind) -> EduLink {
    EduLink::new(
        kind,
        row.get("id"),
        row.get("edu_center_id"),
        row.get("item_id"),
        row.get("item_name"),
        row.get("edu_center_name"),
        row.get("created_at"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{
        insert_catalog_item, insert_center, insert_region, insert_user, migrated_pool,
    };

    async fn setup(kind: CatalogKind) -> (DynDatabasePool, SqlxLinkRepository, i64) {
        let pool = migrated_pool().await;
        let region = insert_region(&pool, "Tashkent").await;
        let owner = insert_user(&pool, 1, "ceo").await;
        let center = insert_center(&pool, "Star Academy", region, owner).await;
        let repo = SqlxLinkRepository::new(pool.clone(), kind);
        (pool, repo, center)
    }

    #[tokio::test]
    async fn test_create_link_and_exists() {
        let (pool, repo, center) = setup(CatalogKind::Subject).await;
        let math = insert_catalog_item(&pool, "subjects", "Math").await;

        let link = repo.create(center, math).await.expect("Failed to create link");

        assert_eq!(link.subject_id, Some(math));
        assert_eq!(link.name, "Math");
        assert_eq!(link.edu_center_name, "Star Academy");
        assert!(repo.exists(center, math).await.unwrap());
        assert!(!repo.exists(center, math + 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_link_rejected() {
        let (pool, repo, center) = setup(CatalogKind::Field).await;
        let it = insert_catalog_item(&pool, "fields", "IT").await;

        repo.create(center, it).await.unwrap();
        let result = repo.create(center, it).await;

        assert!(result.as_ref().is_err_and(crate::db::is_unique_violation));
    }

    #[tokio::test]
    async fn test_list_and_delete_links() {
        let (pool, repo, center) = setup(CatalogKind::Field).await;
        let it = insert_catalog_item(&pool, "fields", "IT").await;
        let law = insert_catalog_item(&pool, "fields", "Law").await;
        let link = repo.create(center, it).await.unwrap();
        repo.create(center, law).await.unwrap();

        let filter = LinkFilter {
            edu_center_id: Some(center),
            item_id: Some(law),
        };
        let (links, total) = repo.list(&filter, &ListParams::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(links[0].field_id, Some(law));

        repo.delete(link.id).await.unwrap();
        let (_, total) = repo
            .list(&LinkFilter::default(), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
    }
}
