//! Subject and field repository
//!
//! One implementation serves both catalogs; the table comes from the
//! repository's [`CatalogKind`].

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CatalogItem, CatalogKind, CatalogSort, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Catalog repository trait
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Which catalog this repository serves
    fn kind(&self) -> CatalogKind;

    async fn create(&self, name: &str, image: &str) -> Result<CatalogItem>;

    async fn get_by_id(&self, id: i64) -> Result<Option<CatalogItem>>;

    async fn update(&self, item: &CatalogItem) -> Result<CatalogItem>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn list(&self, params: &ListParams<CatalogSort>) -> Result<(Vec<CatalogItem>, i64)>;

    /// The ids from `ids` that have no row
    async fn missing_ids(&self, ids: &[i64]) -> Result<Vec<i64>>;

    /// Items a center offers
    async fn list_by_center(&self, edu_center_id: i64) -> Result<Vec<CatalogItem>>;

    /// Items a branch teaches
    async fn list_by_branch(&self, branch_id: i64) -> Result<Vec<CatalogItem>>;
}

/// SQLx-based catalog repository implementation
pub struct SqlxCatalogRepository {
    pool: DynDatabasePool,
    kind: CatalogKind,
}

impl SqlxCatalogRepository {
    pub fn new(pool: DynDatabasePool, kind: CatalogKind) -> Self {
        Self { pool, kind }
    }

    pub fn boxed(pool: DynDatabasePool, kind: CatalogKind) -> Arc<dyn CatalogRepository> {
        Arc::new(Self::new(pool, kind))
    }

    fn select_sql(&self, tail: &str) -> String {
        format!(
            "SELECT id, name, image, created_at, updated_at FROM {} {}",
            self.kind.table(),
            tail
        )
    }

    fn linked_sql(&self, link_table: &str, owner_column: &str) -> String {
        format!(
            r#"
            SELECT i.id, i.name, i.image, i.created_at, i.updated_at
            FROM {table} i
            JOIN {link} l ON l.{item_col} = i.id
            WHERE l.{owner_col} = ?
            ORDER BY i.name
            "#,
            table = self.kind.table(),
            link = link_table,
            item_col = self.kind.id_column(),
            owner_col = owner_column,
        )
    }
}

#[async_trait]
impl CatalogRepository for SqlxCatalogRepository {
    fn kind(&self) -> CatalogKind {
        self.kind
    }

    async fn create(&self, name: &str, image: &str) -> Result<CatalogItem> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO {} (name, image, created_at, updated_at) VALUES (?, ?, ?, ?)",
            self.kind.table()
        );
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(name)
                .bind(image)
                .bind(now)
                .bind(now)
                .execute(self.pool.sqlite()?)
                .await
                .with_context(|| format!("Failed to create {}", self.kind))?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(name)
                .bind(image)
                .bind(now)
                .bind(now)
                .execute(self.pool.mysql()?)
                .await
                .with_context(|| format!("Failed to create {}", self.kind))?
                .last_insert_id() as i64,
        };

        Ok(CatalogItem {
            id,
            name: name.to_string(),
            image: image.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<CatalogItem>> {
        let sql = self.select_sql("WHERE id = ?");
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_item_sqlite(self.pool.sqlite()?, &sql, id, self.kind).await
            }
            DatabaseDriver::Mysql => get_item_mysql(self.pool.mysql()?, &sql, id, self.kind).await,
        }
    }

    async fn update(&self, item: &CatalogItem) -> Result<CatalogItem> {
        let sql = format!(
            "UPDATE {} SET name = ?, image = ?, updated_at = ? WHERE id = ?",
            self.kind.table()
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(&sql)
                    .bind(&item.name)
                    .bind(&item.image)
                    .bind(Utc::now())
                    .bind(item.id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .with_context(|| format!("Failed to update {}", self.kind))?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(&sql)
                    .bind(&item.name)
                    .bind(&item.image)
                    .bind(Utc::now())
                    .bind(item.id)
                    .execute(self.pool.mysql()?)
                    .await
                    .with_context(|| format!("Failed to update {}", self.kind))?;
            }
        }

        self.get_by_id(item.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("{} not found after update", self.kind))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?", self.kind.table());
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(&sql)
                    .bind(id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .with_context(|| format!("Failed to delete {}", self.kind))?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(&sql)
                    .bind(id)
                    .execute(self.pool.mysql()?)
                    .await
                    .with_context(|| format!("Failed to delete {}", self.kind))?;
            }
        }
        Ok(())
    }

    async fn list(&self, params: &ListParams<CatalogSort>) -> Result<(Vec<CatalogItem>, i64)> {
        let pattern = params.contains_pattern();
        let table = self.kind.table();

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = self.pool.sqlite()?;
                let where_clause = r#"WHERE (? IS NULL OR name LIKE ? ESCAPE '\')"#;
                let sql = self.select_sql(&format!(
                    "{} ORDER BY {} LIMIT ? OFFSET ?",
                    where_clause,
                    params.order_by()
                ));
                let rows = sqlx::query(&sql)
                    .bind(&pattern)
                    .bind(&pattern)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .with_context(|| format!("Failed to list {}", table))?;
                let total: i64 = sqlx::query(&format!(
                    "SELECT COUNT(*) as count FROM {} {}",
                    table, where_clause
                ))
                .bind(&pattern)
                .bind(&pattern)
                .fetch_one(pool)
                .await
                .with_context(|| format!("Failed to count {}", table))?
                .get("count");

                Ok((rows.iter().map(row_to_item_sqlite).collect(), total))
            }
            DatabaseDriver::Mysql => {
                let pool = self.pool.mysql()?;
                let where_clause = "WHERE (? IS NULL OR name LIKE ?)";
                let sql = self.select_sql(&format!(
                    "{} ORDER BY {} LIMIT ? OFFSET ?",
                    where_clause,
                    params.order_by()
                ));
                let rows = sqlx::query(&sql)
                    .bind(&pattern)
                    .bind(&pattern)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .with_context(|| format!("Failed to list {}", table))?;
                let total: i64 = sqlx::query(&format!(
                    "SELECT COUNT(*) as count FROM {} {}",
                    table, where_clause
                ))
                .bind(&pattern)
                .bind(&pattern)
                .fetch_one(pool)
                .await
                .with_context(|| format!("Failed to count {}", table))?
                .get("count");

                Ok((rows.iter().map(row_to_item_mysql).collect(), total))
            }
        }
    }

    async fn missing_ids(&self, ids: &[i64]) -> Result<Vec<i64>> {
        let mut missing = Vec::new();
        for &id in ids {
            if self.get_by_id(id).await?.is_none() && !missing.contains(&id) {
                missing.push(id);
            }
        }
        Ok(missing)
    }

    async fn list_by_center(&self, edu_center_id: i64) -> Result<Vec<CatalogItem>> {
        let sql = self.linked_sql(self.kind.center_link_table(), "edu_center_id");
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_linked_sqlite(self.pool.sqlite()?, &sql, edu_center_id).await
            }
            DatabaseDriver::Mysql => list_linked_mysql(self.pool.mysql()?, &sql, edu_center_id).await,
        }
    }

    async fn list_by_branch(&self, branch_id: i64) -> Result<Vec<CatalogItem>> {
        let sql = self.linked_sql(self.kind.branch_link_table(), "branch_id");
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_linked_sqlite(self.pool.sqlite()?, &sql, branch_id).await,
            DatabaseDriver::Mysql => list_linked_mysql(self.pool.mysql()?, &sql, branch_id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_item_sqlite(
    pool: &SqlitePool,
    sql: &str,
    id: i64,
    kind: CatalogKind,
) -> Result<Option<CatalogItem>> {
    let row = sqlx::query(sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get {} by ID", kind))?;

    Ok(row.as_ref().map(row_to_item_sqlite))
}

async fn list_linked_sqlite(pool: &SqlitePool, sql: &str, owner_id: i64) -> Result<Vec<CatalogItem>> {
    let rows = sqlx::query(sql)
        .bind(owner_id)
        .fetch_all(pool)
        .await
        .context("Failed to list linked catalog items")?;

    Ok(rows.iter().map(row_to_item_sqlite).collect())
}

fn row_to_item_sqlite(row: &sqlx::sqlite::SqliteRow) -> CatalogItem {
    CatalogItem {
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

async fn get_item_mysql(
    pool: &MySqlPool,
    sql: &str,
    id: i64,
    kind: CatalogKind,
) -> Result<Option<CatalogItem>> {
    let row = sqlx::query(sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get {} by ID", kind))?;

    Ok(row.as_ref().map(row_to_item_mysql))
}

async fn list_linked_mysql(pool: &MySqlPool, sql: &str, owner_id: i64) -> Result<Vec<CatalogItem>> {
    let rows = sqlx::query(sql)
        .bind(owner_id)
        .fetch_all(pool)
        .await
        .context("Failed to list linked catalog items")?;

    Ok(rows.iter().map(row_to_item_mysql).collect())
}

fn row_to_item_mysql(row: &sqlx::mysql::MySqlRow) -> CatalogItem {
    CatalogItem {
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
    use crate::db::repositories::test_support::{
        insert_center, insert_region, insert_user, link_center, migrated_pool,
    };
    use crate::models::SortOrder;

    #[tokio::test]
    async fn test_subject_and_field_tables_are_separate() {
        let pool = migrated_pool().await;
        let subjects = SqlxCatalogRepository::new(pool.clone(), CatalogKind::Subject);
        let fields = SqlxCatalogRepository::new(pool.clone(), CatalogKind::Field);

        let math = subjects.create("Math", "/uploads/subjects/m.png").await.unwrap();
        fields.create("Math", "/uploads/fields/m.png").await.unwrap();

        let (all_subjects, total) = subjects.list(&ListParams::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(all_subjects[0].id, math.id);
        assert_eq!(fields.kind(), CatalogKind::Field);
    }

    #[tokio::test]
    async fn test_update_and_delete_item() {
        let pool = migrated_pool().await;
        let repo = SqlxCatalogRepository::new(pool, CatalogKind::Subject);
        let mut item = repo.create("Physics", "/uploads/subjects/p.png").await.unwrap();

        item.name = "Applied physics".to_string();
        let updated = repo.update(&item).await.expect("Failed to update");
        assert_eq!(updated.name, "Applied physics");

        repo.delete(item.id).await.expect("Failed to delete");
        assert!(repo.get_by_id(item.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let pool = migrated_pool().await;
        let repo = SqlxCatalogRepository::new(pool, CatalogKind::Field);
        repo.create("IT", "/uploads/fields/it.png").await.unwrap();

        let result = repo.create("IT", "/uploads/fields/it2.png").await;
        assert!(result.as_ref().is_err_and(crate::db::is_unique_violation));
    }

    #[tokio::test]
    async fn test_missing_ids() {
        let pool = migrated_pool().await;
        let repo = SqlxCatalogRepository::new(pool, CatalogKind::Subject);
        let a = repo.create("Biology", "/b.png").await.unwrap();

        let missing = repo.missing_ids(&[a.id, 404, 404, 405]).await.unwrap();
        assert_eq!(missing, vec![404, 405]);
        assert!(repo.missing_ids(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_by_center() {
        let pool = migrated_pool().await;
        let repo = SqlxCatalogRepository::new(pool.clone(), CatalogKind::Subject);
        let region = insert_region(&pool, "Tashkent").await;
        let owner = insert_user(&pool, 1, "ceo").await;
        let center = insert_center(&pool, "Center", region, owner).await;

        let english = repo.create("English", "/e.png").await.unwrap();
        let art = repo.create("Art", "/a.png").await.unwrap();
        repo.create("History", "/h.png").await.unwrap();
        link_center(&pool, "edu_subjects", "subject_id", center, english.id).await;
        link_center(&pool, "edu_subjects", "subject_id", center, art.id).await;

        let offered = repo.list_by_center(center).await.unwrap();
        let names: Vec<_> = offered.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Art", "English"]);
    }

    #[tokio::test]
    async fn test_list_sorted_desc() {
        let pool = migrated_pool().await;
        let repo = SqlxCatalogRepository::new(pool, CatalogKind::Field);
        for name in ["Design", "Accounting", "Medicine"] {
            repo.create(name, "/x.png").await.unwrap();
        }

        let params = ListParams::new(1, 10).with_sort(CatalogSort::Name, SortOrder::Desc);
        let (items, _) = repo.list(&params).await.unwrap();
        assert_eq!(items[0].name, "Medicine");
        assert_eq!(items[2].name, "Accounting");
    }
}
