//! Education center repository
//!
//! A center and the subjects/fields it offers are written in one
//! transaction, so a failed link insert leaves no half-created center.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{
    CatalogKind, EduCenter, EduCenterFilter, EduCenterSort, ListParams, NewEduCenter,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlConnection, MySqlPool, Row, SqliteConnection, SqlitePool};
use std::sync::Arc;

/// Display data computed for one center
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CenterStats {
    pub region_name: Option<String>,
    pub owner_name: Option<String>,
    pub rating: Option<f64>,
    pub comment_count: i64,
    pub like_count: i64,
}

/// Education center repository trait
#[async_trait]
pub trait EduCenterRepository: Send + Sync {
    /// Create a center together with its subject and field links
    async fn create(&self, input: &NewEduCenter) -> Result<EduCenter>;

    async fn get_by_id(&self, id: i64) -> Result<Option<EduCenter>>;

    /// Write the center's columns; `Some` link lists replace existing links
    async fn update(
        &self,
        center: &EduCenter,
        subject_ids: Option<&[i64]>,
        field_ids: Option<&[i64]>,
    ) -> Result<EduCenter>;

    /// Delete a center; links, branches, comments, likes and
    /// registrations cascade
    async fn delete(&self, id: i64) -> Result<()>;

    async fn list(
        &self,
        filter: &EduCenterFilter,
        params: &ListParams<EduCenterSort>,
    ) -> Result<(Vec<EduCenter>, i64)>;

    async fn stats(&self, id: i64) -> Result<CenterStats>;

    /// Number of centers owned by a user
    async fn count_by_user(&self, user_id: i64) -> Result<i64>;

    /// Subject or field ids that course registrations at this center use
    async fn registered_catalog_ids(&self, id: i64, kind: CatalogKind) -> Result<Vec<i64>>;
}

/// SQLx-based education center repository implementation
pub struct SqlxEduCenterRepository {
    pool: DynDatabasePool,
}

impl SqlxEduCenterRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn EduCenterRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl EduCenterRepository for SqlxEduCenterRepository {
    async fn create(&self, input: &NewEduCenter) -> Result<EduCenter> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_center_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => create_center_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<EduCenter>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_center_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_center_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn update(
        &self,
        center: &EduCenter,
        subject_ids: Option<&[i64]>,
        field_ids: Option<&[i64]>,
    ) -> Result<EduCenter> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_center_sqlite(self.pool.sqlite()?, center, subject_ids, field_ids).await
            }
            DatabaseDriver::Mysql => {
                update_center_mysql(self.pool.mysql()?, center, subject_ids, field_ids).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("DELETE FROM edu_centers WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to delete edu center")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query("DELETE FROM edu_centers WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to delete edu center")?;
            }
        }
        Ok(())
    }

    async fn list(
        &self,
        filter: &EduCenterFilter,
        params: &ListParams<EduCenterSort>,
    ) -> Result<(Vec<EduCenter>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_centers_sqlite(self.pool.sqlite()?, filter, params).await,
            DatabaseDriver::Mysql => list_centers_mysql(self.pool.mysql()?, filter, params).await,
        }
    }

    async fn stats(&self, id: i64) -> Result<CenterStats> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&stats_sql("AVG(star)"))
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to load edu center stats")?;
                Ok(row
                    .map(|row| CenterStats {
                        region_name: row.get("region_name"),
                        owner_name: row.get("owner_name"),
                        rating: row.get("rating"),
                        comment_count: row.get("comment_count"),
                        like_count: row.get("like_count"),
                    })
                    .unwrap_or_default())
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&stats_sql("CAST(AVG(star) AS DOUBLE)"))
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to load edu center stats")?;
                Ok(row
                    .map(|row| CenterStats {
                        region_name: row.get("region_name"),
                        owner_name: row.get("owner_name"),
                        rating: row.get("rating"),
                        comment_count: row.get("comment_count"),
                        like_count: row.get("like_count"),
                    })
                    .unwrap_or_default())
            }
        }
    }

    async fn count_by_user(&self, user_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) as count FROM edu_centers WHERE user_id = ?";
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(user_id)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to count edu centers by user")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(user_id)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to count edu centers by user")?
                .get("count"),
        };
        Ok(count)
    }

    async fn registered_catalog_ids(&self, id: i64, kind: CatalogKind) -> Result<Vec<i64>> {
        let sql = format!(
            "SELECT DISTINCT {col} AS item_id FROM course_registrations WHERE edu_center_id = ? ORDER BY {col}",
            col = kind.id_column()
        );
        let ids = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .fetch_all(self.pool.sqlite()?)
                .await
                .context("Failed to list registered catalog ids")?
                .iter()
                .map(|row| row.get("item_id"))
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .fetch_all(self.pool.mysql()?)
                .await
                .context("Failed to list registered catalog ids")?
                .iter()
                .map(|row| row.get("item_id"))
                .collect(),
        };
        Ok(ids)
    }
}

const CENTER_COLUMNS: &str =
    "c.id, c.name, c.image, c.phone, c.license, c.address, c.region_id, c.user_id, c.created_at, c.updated_at";

fn stats_sql(avg_expr: &str) -> String {
    format!(
        r#"
        SELECT r.name AS region_name, u.full_name AS owner_name,
               (SELECT {avg} FROM comments WHERE edu_center_id = c.id) AS rating,
               (SELECT COUNT(*) FROM comments WHERE edu_center_id = c.id) AS comment_count,
               (SELECT COUNT(*) FROM likes WHERE edu_center_id = c.id) AS like_count
        FROM edu_centers c
        LEFT JOIN regions r ON r.id = c.region_id
        LEFT JOIN users u ON u.id = c.user_id
        WHERE c.id = ?
        "#,
        avg = avg_expr
    )
}

const CENTER_FILTER: &str = r#"
    WHERE (? IS NULL OR c.region_id = ?)
      AND (? IS NULL OR c.user_id = ?)
      AND (? IS NULL OR EXISTS (SELECT 1 FROM edu_subjects es WHERE es.edu_center_id = c.id AND es.subject_id = ?))
      AND (? IS NULL OR EXISTS (SELECT 1 FROM edu_fields ef WHERE ef.edu_center_id = c.id AND ef.field_id = ?))
"#;

fn sorted_unique(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

// ============================================================================
// SQLite implementations
// ============================================================================

/// Replace the links of `owner_id` in `link_table` inside a transaction
pub(super) async fn replace_links_sqlite(
    conn: &mut SqliteConnection,
    link_table: &str,
    owner_column: &str,
    kind: CatalogKind,
    owner_id: i64,
    ids: &[i64],
) -> Result<()> {
    sqlx::query(&format!("DELETE FROM {} WHERE {} = ?", link_table, owner_column))
        .bind(owner_id)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to clear {}", link_table))?;

    let insert = format!(
        "INSERT INTO {} ({}, {}, created_at) VALUES (?, ?, ?)",
        link_table,
        owner_column,
        kind.id_column()
    );
    for id in sorted_unique(ids) {
        sqlx::query(&insert)
            .bind(owner_id)
            .bind(id)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to link {} {}", kind, id))?;
    }
    Ok(())
}

async fn create_center_sqlite(pool: &SqlitePool, input: &NewEduCenter) -> Result<EduCenter> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let id = sqlx::query(
        r#"
        INSERT INTO edu_centers (name, image, phone, license, address, region_id, user_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.name)
    .bind(&input.image)
    .bind(&input.phone)
    .bind(&input.license)
    .bind(&input.address)
    .bind(input.region_id)
    .bind(input.user_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create edu center")?
    .last_insert_rowid();

    for (kind, ids) in [
        (CatalogKind::Subject, &input.subject_ids),
        (CatalogKind::Field, &input.field_ids),
    ] {
        replace_links_sqlite(&mut tx, kind.center_link_table(), "edu_center_id", kind, id, ids)
            .await?;
    }

    tx.commit().await.context("Failed to commit edu center")?;

    Ok(EduCenter {
        id,
        name: input.name.clone(),
        image: input.image.clone(),
        phone: input.phone.clone(),
        license: input.license.clone(),
        address: input.address.clone(),
        region_id: input.region_id,
        user_id: input.user_id,
        created_at: now,
        updated_at: now,
    })
}

async fn get_center_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<EduCenter>> {
    let sql = format!("SELECT {} FROM edu_centers c WHERE c.id = ?", CENTER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get edu center by ID")?;

    Ok(row.as_ref().map(row_to_center_sqlite))
}

async fn update_center_sqlite(
    pool: &SqlitePool,
    center: &EduCenter,
    subject_ids: Option<&[i64]>,
    field_ids: Option<&[i64]>,
) -> Result<EduCenter> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(
        r#"
        UPDATE edu_centers
        SET name = ?, image = ?, phone = ?, license = ?, address = ?, region_id = ?, user_id = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&center.name)
    .bind(&center.image)
    .bind(&center.phone)
    .bind(&center.license)
    .bind(&center.address)
    .bind(center.region_id)
    .bind(center.user_id)
    .bind(Utc::now())
    .bind(center.id)
    .execute(&mut *tx)
    .await
    .context("Failed to update edu center")?;

    for (kind, ids) in [(CatalogKind::Subject, subject_ids), (CatalogKind::Field, field_ids)] {
        if let Some(ids) = ids {
            replace_links_sqlite(&mut tx, kind.center_link_table(), "edu_center_id", kind, center.id, ids)
                .await?;
        }
    }

    tx.commit().await.context("Failed to commit edu center")?;

    get_center_by_id_sqlite(pool, center.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Edu center not found after update"))
}

async fn list_centers_sqlite(
    pool: &SqlitePool,
    filter: &EduCenterFilter,
    params: &ListParams<EduCenterSort>,
) -> Result<(Vec<EduCenter>, i64)> {
    let search = r#"AND (? IS NULL OR c.name LIKE ? ESCAPE '\')"#;
    let pattern = params.prefix_pattern();

    let sql = format!(
        "SELECT {} FROM edu_centers c {} {} ORDER BY {} LIMIT ? OFFSET ?",
        CENTER_COLUMNS,
        CENTER_FILTER,
        search,
        params.order_by()
    );
    let rows = sqlx::query(&sql)
        .bind(filter.region_id)
        .bind(filter.region_id)
        .bind(filter.user_id)
        .bind(filter.user_id)
        .bind(filter.subject_id)
        .bind(filter.subject_id)
        .bind(filter.field_id)
        .bind(filter.field_id)
        .bind(&pattern)
        .bind(&pattern)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list edu centers")?;

    let count_sql = format!(
        "SELECT COUNT(*) as count FROM edu_centers c {} {}",
        CENTER_FILTER, search
    );
    let total: i64 = sqlx::query(&count_sql)
        .bind(filter.region_id)
        .bind(filter.region_id)
        .bind(filter.user_id)
        .bind(filter.user_id)
        .bind(filter.subject_id)
        .bind(filter.subject_id)
        .bind(filter.field_id)
        .bind(filter.field_id)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_one(pool)
        .await
        .context("Failed to count edu centers")?
        .get("count");

    Ok((rows.iter().map(row_to_center_sqlite).collect(), total))
}

fn row_to_center_sqlite(row: &sqlx::sqlite::SqliteRow) -> EduCenter {
    EduCenter {
        id: row.get("id"),
        name: row.get("name"),
        image: row.get("image"),
        phone: row.get("phone"),
        license: row.get("license"),
        address: row.get("address"),
        region_id: row.get("region_id"),
        user_id: row.get("user_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

/// Replace the links of `owner_id` in `link_table` inside a transaction
pub(super) async fn replace_links_mysql(
    conn: &mut MySqlConnection,
    link_table: &str,
    owner_column: &str,
    kind: CatalogKind,
    owner_id: i64,
    ids: &[i64],
) -> Result<()> {
    sqlx::query(&format!("DELETE FROM {} WHERE {} = ?", link_table, owner_column))
        .bind(owner_id)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to clear {}", link_table))?;

    let insert = format!(
        "INSERT INTO {} ({}, {}, created_at) VALUES (?, ?, ?)",
        link_table,
        owner_column,
        kind.id_column()
    );
    for id in sorted_unique(ids) {
        sqlx::query(&insert)
            .bind(owner_id)
            .bind(id)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to link {} {}", kind, id))?;
    }
    Ok(())
}

async fn create_center_mysql(pool: &MySqlPool, input: &NewEduCenter) -> Result<EduCenter> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let id = sqlx::query(
        r#"
        INSERT INTO edu_centers (name, image, phone, license, address, region_id, user_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.name)
    .bind(&input.image)
    .bind(&input.phone)
    .bind(&input.license)
    .bind(&input.address)
    .bind(input.region_id)
    .bind(input.user_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create edu center")?
    .last_insert_id() as i64;

    for (kind, ids) in [
        (CatalogKind::Subject, &input.subject_ids),
        (CatalogKind::Field, &input.field_ids),
    ] {
        replace_links_mysql(&mut tx, kind.center_link_table(), "edu_center_id", kind, id, ids)
            .await?;
    }

    tx.commit().await.context("Failed to commit edu center")?;

    Ok(EduCenter {
        id,
        name: input.name.clone(),
        image: input.image.clone(),
        phone: input.phone.clone(),
        license: input.license.clone(),
        address: input.address.clone(),
        region_id: input.region_id,
        user_id: input.user_id,
        created_at: now,
        updated_at: now,
    })
}

async fn get_center_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<EduCenter>> {
    let sql = format!("SELECT {} FROM edu_centers c WHERE c.id = ?", CENTER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get edu center by ID")?;

    Ok(row.as_ref().map(row_to_center_mysql))
}

async fn update_center_mysql(
    pool: &MySqlPool,
    center: &EduCenter,
    subject_ids: Option<&[i64]>,
    field_ids: Option<&[i64]>,
) -> Result<EduCenter> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(
        r#"
        UPDATE edu_centers
        SET name = ?, image = ?, phone = ?, license = ?, address = ?, region_id = ?, user_id = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&center.name)
    .bind(&center.image)
    .bind(&center.phone)
    .bind(&center.license)
    .bind(&center.address)
    .bind(center.region_id)
    .bind(center.user_id)
    .bind(Utc::now())
    .bind(center.id)
    .execute(&mut *tx)
    .await
    .context("Failed to update edu center")?;

    for (kind, ids) in [(CatalogKind::Subject, subject_ids), (CatalogKind::Field, field_ids)] {
        if let Some(ids) = ids {
            replace_links_mysql(&mut tx, kind.center_link_table(), "edu_center_id", kind, center.id, ids)
                .await?;
        }
    }

    tx.commit().await.context("Failed to commit edu center")?;

    get_center_by_id_mysql(pool, center.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Edu center not found after update"))
}

async fn list_centers_mysql(
    pool: &MySqlPool,
    filter: &EduCenterFilter,
    params: &ListParams<EduCenterSort>,
) -> Result<(Vec<EduCenter>, i64)> {
    let search = "AND (? IS NULL OR c.name LIKE ?)";
    let pattern = params.prefix_pattern();

    let sql = format!(
        "SELECT {} FROM edu_centers c {} {} ORDER BY {} LIMIT ? OFFSET ?",
        CENTER_COLUMNS,
        CENTER_FILTER,
        search,
        params.order_by()
    );
    let rows = sqlx::query(&sql)
        .bind(filter.region_id)
        .bind(filter.region_id)
        .bind(filter.user_id)
        .bind(filter.user_id)
        .bind(filter.subject_id)
        .bind(filter.subject_id)
        .bind(filter.field_id)
        .bind(filter.field_id)
        .bind(&pattern)
        .bind(&pattern)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list edu centers")?;

    let count_sql = format!(
        "SELECT COUNT(*) as count FROM edu_centers c {} {}",
        CENTER_FILTER, search
    );
    let total: i64 = sqlx::query(&count_sql)
        .bind(filter.region_id)
        .bind(filter.region_id)
        .bind(filter.user_id)
        .bind(filter.user_id)
        .bind(filter.subject_id)
        .bind(filter.subject_id)
        .bind(filter.field_id)
        .bind(filter.field_id)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_one(pool)
        .await
        .context("Failed to count edu centers")?
        .get("count");

    Ok((rows.iter().map(row_to_center_mysql).collect(), total))
}

fn row_to_center_mysql(row: &sqlx::mysql::MySqlRow) -> EduCenter {
    EduCenter {
        id: row.get("id"),
        name: row.get("name"),
        image: row.get("image"),
        phone: row.get("phone"),
        license: row.get("license"),
        address: row.get("address"),
        region_id: row.get("region_id"),
        user_id: row.get("user_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{
        insert_catalog_item, insert_region, insert_user, migrated_pool,
    };
    use crate::db::repositories::{CatalogRepository, SqlxCatalogRepository};

    struct Fixture {
        pool: DynDatabasePool,
        repo: SqlxEduCenterRepository,
        region: i64,
        owner: i64,
        math: i64,
        english: i64,
        it: i64,
    }

    async fn setup() -> Fixture {
        let pool = migrated_pool().await;
        Fixture {
            region: insert_region(&pool, "Tashkent").await,
            owner: insert_user(&pool, 1, "ceo").await,
            math: insert_catalog_item(&pool, "subjects", "Math").await,
            english: insert_catalog_item(&pool, "subjects", "English").await,
            it: insert_catalog_item(&pool, "fields", "IT").await,
            repo: SqlxEduCenterRepository::new(pool.clone()),
            pool,
        }
    }

    fn new_center(f: &Fixture, name: &str, subject_ids: Vec<i64>, field_ids: Vec<i64>) -> NewEduCenter {
        NewEduCenter {
            name: name.to_string(),
            image: "/uploads/center.png".to_string(),
            phone: "+998712345678".to_string(),
            license: "LIC-42".to_string(),
            address: Some("Amir Temur 1".to_string()),
            region_id: f.region,
            user_id: f.owner,
            subject_ids,
            field_ids,
        }
    }

    #[tokio::test]
    async fn test_create_center_with_links() {
        let f = setup().await;

        let center = f
            .repo
            .create(&new_center(&f, "Star", vec![f.math, f.english, f.math], vec![f.it]))
            .await
            .expect("Failed to create center");

        let subjects = SqlxCatalogRepository::new(f.pool.clone(), CatalogKind::Subject)
            .list_by_center(center.id)
            .await
            .unwrap();
        let fields = SqlxCatalogRepository::new(f.pool.clone(), CatalogKind::Field)
            .list_by_center(center.id)
            .await
            .unwrap();
        assert_eq!(subjects.len(), 2);
        assert_eq!(fields.len(), 1);
    }

    #[tokio::test]
    async fn test_create_center_rolls_back_on_bad_link() {
        let f = setup().await;

        let result = f
            .repo
            .create(&new_center(&f, "Broken", vec![f.math, 9999], vec![]))
            .await;
        assert!(result.is_err());

        let (centers, total) = f
            .repo
            .list(&EduCenterFilter::default(), &ListParams::default())
            .await
            .unwrap();
        assert!(centers.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_update_replaces_links_only_when_given() {
        let f = setup().await;
        let mut center = f
            .repo
            .create(&new_center(&f, "Star", vec![f.math], vec![f.it]))
            .await
            .unwrap();
        let subjects = SqlxCatalogRepository::new(f.pool.clone(), CatalogKind::Subject);
        let fields = SqlxCatalogRepository::new(f.pool.clone(), CatalogKind::Field);

        center.name = "Star Plus".to_string();
        let updated = f
            .repo
            .update(&center, Some(&[f.english]), None)
            .await
            .expect("Failed to update center");

        assert_eq!(updated.name, "Star Plus");
        let offered = subjects.list_by_center(center.id).await.unwrap();
        assert_eq!(offered.len(), 1);
        assert_eq!(offered[0].id, f.english);
        assert_eq!(fields.list_by_center(center.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_filters_and_prefix_search() {
        let f = setup().await;
        f.repo
            .create(&new_center(&f, "Alpha School", vec![f.math], vec![]))
            .await
            .unwrap();
        f.repo
            .create(&new_center(&f, "Beta Alpha", vec![f.english], vec![f.it]))
            .await
            .unwrap();

        let by_subject = EduCenterFilter {
            subject_id: Some(f.math),
            ..Default::default()
        };
        let (centers, total) = f.repo.list(&by_subject, &ListParams::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(centers[0].name, "Alpha School");

        let params = ListParams::new(1, 10).with_search(Some("alp".into()));
        let (centers, total) = f
            .repo
            .list(&EduCenterFilter::default(), &params)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(centers[0].name, "Alpha School");

        let by_field = EduCenterFilter {
            field_id: Some(f.it),
            region_id: Some(f.region),
            ..Default::default()
        };
        let (_, total) = f.repo.list(&by_field, &ListParams::default()).await.unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let f = setup().await;
        let center = f
            .repo
            .create(&new_center(&f, "Rated", vec![], vec![]))
            .await
            .unwrap();

        let empty = f.repo.stats(center.id).await.unwrap();
        assert_eq!(empty.rating, None);
        assert_eq!(empty.region_name.as_deref(), Some("Tashkent"));
        assert_eq!(empty.owner_name.as_deref(), Some("User 1"));

        let reviewer = insert_user(&f.pool, 2, "user").await;
        for star in [4, 5] {
            sqlx::query(
                "INSERT INTO comments (user_id, edu_center_id, comment, star, created_at, updated_at) VALUES (?, ?, 'ok', ?, ?, ?)",
            )
            .bind(reviewer)
            .bind(center.id)
            .bind(star)
            .bind(Utc::now())
            .bind(Utc::now())
            .execute(f.pool.sqlite().unwrap())
            .await
            .unwrap();
        }
        sqlx::query("INSERT INTO likes (user_id, edu_center_id, created_at) VALUES (?, ?, ?)")
            .bind(reviewer)
            .bind(center.id)
            .bind(Utc::now())
            .execute(f.pool.sqlite().unwrap())
            .await
            .unwrap();

        let stats = f.repo.stats(center.id).await.unwrap();
        assert_eq!(stats.rating, Some(4.5));
        assert_eq!(stats.comment_count, 2);
        assert_eq!(stats.like_count, 1);
        assert_eq!(f.repo.count_by_user(f.owner).await.unwrap(), 1);
    }
}
