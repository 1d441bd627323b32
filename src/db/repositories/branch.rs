//! Branch repository

use super::edu_center::{replace_links_mysql, replace_links_sqlite};
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Branch, BranchFilter, BranchSort, CatalogKind, ListParams, NewBranch};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Branch repository trait
#[async_trait]
pub trait BranchRepository: Send + Sync {
    /// Create a branch with its subject and field links in one transaction
    async fn create(&self, input: &NewBranch) -> Result<Branch>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Branch>>;

    /// Write the branch's columns; `Some` link lists replace existing links
    async fn update(
        &self,
        branch: &Branch,
        subject_ids: Option<&[i64]>,
        field_ids: Option<&[i64]>,
    ) -> Result<Branch>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn list(
        &self,
        filter: &BranchFilter,
        params: &ListParams<BranchSort>,
    ) -> Result<(Vec<Branch>, i64)>;

    /// All branches of a center, by name
    async fn list_by_center(&self, edu_center_id: i64) -> Result<Vec<Branch>>;
}

/// SQLx-based branch repository implementation
pub struct SqlxBranchRepository {
    pool: DynDatabasePool,
}

impl SqlxBranchRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BranchRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl BranchRepository for SqlxBranchRepository {
    async fn create(&self, input: &NewBranch) -> Result<Branch> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_branch_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => create_branch_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Branch>> {
        let sql = format!("SELECT {} FROM branches WHERE id = ?", BRANCH_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get branch by ID")?;
                Ok(row.as_ref().map(row_to_branch_sqlite))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get branch by ID")?;
                Ok(row.as_ref().map(row_to_branch_mysql))
            }
        }
    }

    async fn update(
        &self,
        branch: &Branch,
        subject_ids: Option<&[i64]>,
        field_ids: Option<&[i64]>,
    ) -> Result<Branch> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_branch_sqlite(self.pool.sqlite()?, branch, subject_ids, field_ids).await?
            }
            DatabaseDriver::Mysql => {
                update_branch_mysql(self.pool.mysql()?, branch, subject_ids, field_ids).await?
            }
        }

        self.get_by_id(branch.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Branch not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("DELETE FROM branches WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to delete branch")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query("DELETE FROM branches WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to delete branch")?;
            }
        }
        Ok(())
    }

    async fn list(
        &self,
        filter: &BranchFilter,
        params: &ListParams<BranchSort>,
    ) -> Result<(Vec<Branch>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_branches_sqlite(self.pool.sqlite()?, filter, params).await,
            DatabaseDriver::Mysql => list_branches_mysql(self.pool.mysql()?, filter, params).await,
        }
    }

    async fn list_by_center(&self, edu_center_id: i64) -> Result<Vec<Branch>> {
        let sql = format!(
            "SELECT {} FROM branches WHERE edu_center_id = ? ORDER BY name ASC",
            BRANCH_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(&sql)
                    .bind(edu_center_id)
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to list center branches")?;
                Ok(rows.iter().map(row_to_branch_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(&sql)
                    .bind(edu_center_id)
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to list center branches")?;
                Ok(rows.iter().map(row_to_branch_mysql).collect())
            }
        }
    }
}

const BRANCH_COLUMNS: &str =
    "id, name, image, phone, location, region_id, edu_center_id, created_at, updated_at";

const BRANCH_FILTER: &str =
    "WHERE (? IS NULL OR edu_center_id = ?) AND (? IS NULL OR region_id = ?)";

const INSERT_BRANCH: &str = r#"
    INSERT INTO branches (name, image, phone, location, region_id, edu_center_id, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#;

const UPDATE_BRANCH: &str = r#"
    UPDATE branches
    SET name = ?, image = ?, phone = ?, location = ?, region_id = ?, updated_at = ?
    WHERE id = ?
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_branch_sqlite(pool: &SqlitePool, input: &NewBranch) -> Result<Branch> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let id = sqlx::query(INSERT_BRANCH)
        .bind(&input.name)
        .bind(&input.image)
        .bind(&input.phone)
        .bind(&input.location)
        .bind(input.region_id)
        .bind(input.edu_center_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create branch")?
        .last_insert_rowid();

    for (kind, ids) in [
        (CatalogKind::Subject, &input.subject_ids),
        (CatalogKind::Field, &input.field_ids),
    ] {
        replace_links_sqlite(&mut tx, kind.branch_link_table(), "branch_id", kind, id, ids).await?;
    }

    tx.commit().await.context("Failed to commit branch")?;

    Ok(new_branch_row(id, input, now))
}

async fn update_branch_sqlite(
    pool: &SqlitePool,
    branch: &Branch,
    subject_ids: Option<&[i64]>,
    field_ids: Option<&[i64]>,
) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(UPDATE_BRANCH)
        .bind(&branch.name)
        .bind(&branch.image)
        .bind(&branch.phone)
        .bind(&branch.location)
        .bind(branch.region_id)
        .bind(Utc::now())
        .bind(branch.id)
        .execute(&mut *tx)
        .await
        .context("Failed to update branch")?;

    for (kind, ids) in [(CatalogKind::Subject, subject_ids), (CatalogKind::Field, field_ids)] {
        if let Some(ids) = ids {
            replace_links_sqlite(&mut tx, kind.branch_link_table(), "branch_id", kind, branch.id, ids)
                .await?;
        }
    }

    tx.commit().await.context("Failed to commit branch")
}

async fn list_branches_sqlite(
    pool: &SqlitePool,
    filter: &BranchFilter,
    params: &ListParams<BranchSort>,
) -> Result<(Vec<Branch>, i64)> {
    let search = r#"AND (? IS NULL OR name LIKE ? ESCAPE '\')"#;
    let pattern = params.contains_pattern();

    let sql = format!(
        "SELECT {} FROM branches {} {} ORDER BY {} LIMIT ? OFFSET ?",
        BRANCH_COLUMNS,
        BRANCH_FILTER,
        search,
        params.order_by()
    );
    let rows = sqlx::query(&sql)
        .bind(filter.edu_center_id)
        .bind(filter.edu_center_id)
        .bind(filter.region_id)
        .bind(filter.region_id)
        .bind(&pattern)
        .bind(&pattern)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list branches")?;

    let count_sql = format!("SELECT COUNT(*) as count FROM branches {} {}", BRANCH_FILTER, search);
    let total: i64 = sqlx::query(&count_sql)
        .bind(filter.edu_center_id)
        .bind(filter.edu_center_id)
        .bind(filter.region_id)
        .bind(filter.region_id)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_one(pool)
        .await
        .context("Failed to count branches")?
        .get("count");

    Ok((rows.iter().map(row_to_branch_sqlite).collect(), total))
}

fn row_to_branch_sqlite(row: &sqlx::sqlite::SqliteRow) -> Branch {
    Branch {
        id: row.get("id"),
        name: row.get("name"),
        image: row.get("image"),
        phone: row.get("phone"),
        location: row.get("location"),
        region_id: row.get("region_id"),
        edu_center_id: row.get("edu_center_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_branch_mysql(pool: &MySqlPool, input: &NewBranch) -> Result<Branch> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let id = sqlx::query(INSERT_BRANCH)
        .bind(&input.name)
        .bind(&input.image)
        .bind(&input.phone)
        .bind(&input.location)
        .bind(input.region_id)
        .bind(input.edu_center_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create branch")?
        .last_insert_id() as i64;

    for (kind, ids) in [
        (CatalogKind::Subject, &input.subject_ids),
        (CatalogKind::Field, &input.field_ids),
    ] {
        replace_links_mysql(&mut tx, kind.branch_link_table(), "branch_id", kind, id, ids).await?;
    }

    tx.commit().await.context("Failed to commit branch")?;

    Ok(new_branch_row(id, input, now))
}

async fn update_branch_mysql(
    pool: &MySqlPool,
    branch: &Branch,
    subject_ids: Option<&[i64]>,
    field_ids: Option<&[i64]>,
) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(UPDATE_BRANCH)
        .bind(&branch.name)
        .bind(&branch.image)
        .bind(&branch.phone)
        .bind(&branch.location)
        .bind(branch.region_id)
        .bind(Utc::now())
        .bind(branch.id)
        .execute(&mut *tx)
        .await
        .context("Failed to update branch")?;

    for (kind, ids) in [(CatalogKind::Subject, subject_ids), (CatalogKind::Field, field_ids)] {
        if let Some(ids) = ids {
            replace_links_mysql(&mut tx, kind.branch_link_table(), "branch_id", kind, branch.id, ids)
                .await?;
        }
    }

    tx.commit().await.context("Failed to commit branch")
}

async fn list_branches_mysql(
    pool: &MySqlPool,
    filter: &BranchFilter,
    params: &ListParams<BranchSort>,
) -> Result<(Vec<Branch>, i64)> {
    let search = "AND (? IS NULL OR name LIKE ?)";
    let pattern = params.contains_pattern();

    let sql = format!(
        "SELECT {} FROM branches {} {} ORDER BY {} LIMIT ? OFFSET ?",
        BRANCH_COLUMNS,
        BRANCH_FILTER,
        search,
        params.order_by()
    );
    let rows = sqlx::query(&sql)
        .bind(filter.edu_center_id)
        .bind(filter.edu_center_id)
        .bind(filter.region_id)
        .bind(filter.region_id)
        .bind(&pattern)
        .bind(&pattern)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list branches")?;

    let count_sql = format!("SELECT COUNT(*) as count FROM branches {} {}", BRANCH_FILTER, search);
    let total: i64 = sqlx::query(&count_sql)
        .bind(filter.edu_center_id)
        .bind(filter.edu_center_id)
        .bind(filter.region_id)
        .bind(filter.region_id)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_one(pool)
        .await
        .context("Failed to count branches")?
        .get("count");

    Ok((rows.iter().map(row_to_branch_mysql).collect(), total))
}

fn row_to_branch_mysql(row: &sqlx::mysql::MySqlRow) -> Branch {
    Branch {
        id: row.get("id"),
        name: row.get("name"),
        image: row.get("image"),
        phone: row.get("phone"),
        location: row.get("location"),
        region_id: row.get("region_id"),
        edu_center_id: row.get("edu_center_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn new_branch_row(id: i64, input: &NewBranch, now: chrono::DateTime<Utc>) -> Branch {
    Branch {
        id,
        name: input.name.clone(),
        image: input.image.clone(),
        phone: input.phone.clone(),
        location: input.location.clone(),
        region_id: input.region_id,
        edu_center_id: input.edu_center_id,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{
        insert_catalog_item, insert_center, insert_region, insert_user, migrated_pool,
    };
    use crate::db::repositories::{CatalogRepository, SqlxCatalogRepository};

    async fn setup() -> (DynDatabasePool, SqlxBranchRepository, i64, i64) {
        let pool = migrated_pool().await;
        let region = insert_region(&pool, "Samarkand").await;
        let owner = insert_user(&pool, 1, "ceo").await;
        let center = insert_center(&pool, "Star Academy", region, owner).await;
        (pool.clone(), SqlxBranchRepository::new(pool), region, center)
    }

    fn new_branch(name: &str, region: i64, center: i64, subject_ids: Vec<i64>) -> NewBranch {
        NewBranch {
            name: name.to_string(),
            image: "/uploads/branch.png".to_string(),
            phone: "+998712223344".to_string(),
            location: "Registan 5".to_string(),
            region_id: region,
            edu_center_id: center,
            subject_ids,
            field_ids: vec![],
        }
    }

    #[tokio::test]
    async fn test_create_branch_with_subjects() {
        let (pool, repo, region, center) = setup().await;
        let math = insert_catalog_item(&pool, "subjects", "Math").await;

        let branch = repo
            .create(&new_branch("North", region, center, vec![math]))
            .await
            .expect("Failed to create branch");

        let subjects = SqlxCatalogRepository::new(pool, CatalogKind::Subject)
            .list_by_branch(branch.id)
            .await
            .unwrap();
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].name, "Math");
        assert_eq!(repo.list_by_center(center).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_branch_replaces_subjects() {
        let (pool, repo, region, center) = setup().await;
        let math = insert_catalog_item(&pool, "subjects", "Math").await;
        let physics = insert_catalog_item(&pool, "subjects", "Physics").await;
        let mut branch = repo
            .create(&new_branch("North", region, center, vec![math]))
            .await
            .unwrap();

        branch.location = "Registan 7".to_string();
        let updated = repo
            .update(&branch, Some(&[physics]), None)
            .await
            .expect("Failed to update branch");

        assert_eq!(updated.location, "Registan 7");
        let subjects = SqlxCatalogRepository::new(pool, CatalogKind::Subject)
            .list_by_branch(branch.id)
            .await
            .unwrap();
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].id, physics);
    }

    #[tokio::test]
    async fn test_list_and_delete_branches() {
        let (pool, repo, region, center) = setup().await;
        let other_region = insert_region(&pool, "Bukhara").await;
        repo.create(&new_branch("North", region, center, vec![]))
            .await
            .unwrap();
        let south = repo
            .create(&new_branch("South", other_region, center, vec![]))
            .await
            .unwrap();

        let filter = BranchFilter {
            region_id: Some(other_region),
            ..Default::default()
        };
        let (branches, total) = repo.list(&filter, &ListParams::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(branches[0].name, "South");

        let params = ListParams::new(1, 10).with_search(Some("ort".into()));
        let (_, total) = repo
            .list(&BranchFilter::default(), &params)
            .await
            .unwrap();
        assert_eq!(total, 1);

        repo.delete(south.id).await.unwrap();
        assert!(repo.get_by_id(south.id).await.unwrap().is_none());
    }
}
