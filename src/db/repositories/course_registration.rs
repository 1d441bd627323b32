//! Course registration repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{
    CourseRegistration, ListParams, RegistrationFilter, RegistrationSort, RegistrationTarget,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait CourseRegistrationRepository: Send + Sync {
    async fn create(&self, user_id: i64, target: &RegistrationTarget) -> Result<CourseRegistration>;

    async fn get_by_id(&self, id: i64) -> Result<Option<CourseRegistration>>;

    async fn update(&self, id: i64, target: &RegistrationTarget) -> Result<CourseRegistration>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn list(
        &self,
        filter: &RegistrationFilter,
        params: &ListParams<RegistrationSort>,
    ) -> Result<(Vec<CourseRegistration>, i64)>;
}

/// SQLx-based course registration repository implementation
pub struct SqlxCourseRegistrationRepository {
    pool: DynDatabasePool,
}

impl SqlxCourseRegistrationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CourseRegistrationRepository> {
        Arc::new(Self::new(pool))
    }
}

const REGISTRATION_SELECT: &str = r#"
    SELECT cr.id, cr.user_id, cr.edu_center_id, cr.branch_id, cr.subject_id, cr.field_id,
           u.full_name AS user_full_name, c.name AS edu_center_name, b.name AS branch_name,
           s.name AS subject_name, f.name AS field_name, cr.created_at, cr.updated_at
    FROM course_registrations cr
    JOIN users u ON u.id = cr.user_id
    JOIN edu_centers c ON c.id = cr.edu_center_id
    JOIN branches b ON b.id = cr.branch_id
    JOIN subjects s ON s.id = cr.subject_id
    JOIN fields f ON f.id = cr.field_id
"#;

const REGISTRATION_FILTER: &str = r#"
    WHERE (? IS NULL OR cr.user_id = ?)
      AND (? IS NULL OR cr.edu_center_id = ?)
      AND (? IS NULL OR cr.branch_id = ?)
"#;

#[async_trait]
impl CourseRegistrationRepository for SqlxCourseRegistrationRepository {
    async fn create(&self, user_id: i64, target: &RegistrationTarget) -> Result<CourseRegistration> {
        let now = Utc::now();
        let sql = r#"
            INSERT INTO course_registrations (user_id, edu_center_id, branch_id, subject_id, field_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
        "#;
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(user_id)
                .bind(target.edu_center_id)
                .bind(target.branch_id)
                .bind(target.subject_id)
                .bind(target.field_id)
                .bind(now)
                .bind(now)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to create course registration")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(user_id)
                .bind(target.edu_center_id)
                .bind(target.branch_id)
                .bind(target.subject_id)
                .bind(target.field_id)
                .bind(now)
                .bind(now)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to create course registration")?
                .last_insert_id() as i64,
        };

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Course registration not found after insert"))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<CourseRegistration>> {
        let sql = format!("{} WHERE cr.id = ?", REGISTRATION_SELECT);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get course registration")?;
                Ok(row.as_ref().map(row_to_registration_sqlite))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get course registration")?;
                Ok(row.as_ref().map(row_to_registration_mysql))
            }
        }
    }

    async fn update(&self, id: i64, target: &RegistrationTarget) -> Result<CourseRegistration> {
        let sql = r#"
            UPDATE course_registrations
            SET edu_center_id = ?, branch_id = ?, subject_id = ?, field_id = ?, updated_at = ?
            WHERE id = ?
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(target.edu_center_id)
                    .bind(target.branch_id)
                    .bind(target.subject_id)
                    .bind(target.field_id)
                    .bind(Utc::now())
                    .bind(id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to update course registration")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(target.edu_center_id)
                    .bind(target.branch_id)
                    .bind(target.subject_id)
                    .bind(target.field_id)
                    .bind(Utc::now())
                    .bind(id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to update course registration")?;
            }
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Course registration not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM course_registrations WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to delete course registration")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to delete course registration")?;
            }
        }
        Ok(())
    }

    async fn list(
        &self,
        filter: &RegistrationFilter,
        params: &ListParams<RegistrationSort>,
    ) -> Result<(Vec<CourseRegistration>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_registrations_sqlite(self.pool.sqlite()?, filter, params).await
            }
            DatabaseDriver::Mysql => {
                list_registrations_mysql(self.pool.mysql()?, filter, params).await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn list_registrations_sqlite(
    pool: &SqlitePool,
    filter: &RegistrationFilter,
    params: &ListParams<RegistrationSort>,
) -> Result<(Vec<CourseRegistration>, i64)> {
    let sql = format!(
        "{} {} ORDER BY {} LIMIT ? OFFSET ?",
        REGISTRATION_SELECT,
        REGISTRATION_FILTER,
        params.order_by()
    );
    let rows = sqlx::query(&sql)
        .bind(filter.user_id)
        .bind(filter.user_id)
        .bind(filter.edu_center_id)
        .bind(filter.edu_center_id)
        .bind(filter.branch_id)
        .bind(filter.branch_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list course registrations")?;

    let count_sql = format!(
        "SELECT COUNT(*) as count FROM course_registrations cr {}",
        REGISTRATION_FILTER
    );
    let total: i64 = sqlx::query(&count_sql)
        .bind(filter.user_id)
        .bind(filter.user_id)
        .bind(filter.edu_center_id)
        .bind(filter.edu_center_id)
        .bind(filter.branch_id)
        .bind(filter.branch_id)
        .fetch_one(pool)
        .await
        .context("Failed to count course registrations")?
        .get("count");

    Ok((rows.iter().map(row_to_registration_sqlite).collect(), total))
}

fn row_to_registration_sqlite(row: &sqlx::sqlite::SqliteRow) -> CourseRegistration {
    CourseRegistration {
        id: row.get("id"),
        user_id: row.get("user_id"),
        edu_center_id: row.get("edu_center_id"),
        branch_id: row.get("branch_id"),
        subject_id: row.get("subject_id"),
        field_id: row.get("field_id"),
        user_full_name: row.get("user_full_name"),
        edu_center_name: row.get("edu_center_name"),
        branch_name: row.get("branch_name"),
        subject_name: row.get("subject_name"),
        field_name: row.get("field_name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn list_registrations_mysql(
    pool: &MySqlPool,
    filter: &RegistrationFilter,
    params: &ListParams<RegistrationSort>,
) -> Result<(Vec<CourseRegistration>, i64)> {
    let sql = format!(
        "{} {} ORDER BY {} LIMIT ? OFFSET ?",
        REGISTRATION_SELECT,
        REGISTRATION_FILTER,
        params.order_by()
    );
    let rows = sqlx::query(&sql)
        .bind(filter.user_id)
        .bind(filter.user_id)
        .bind(filter.edu_center_id)
        .bind(filter.edu_center_id)
        .bind(filter.branch_id)
        .bind(filter.branch_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list course registrations")?;

    let count_sql = format!(
        "SELECT COUNT(*) as count FROM course_registrations cr {}",
        REGISTRATION_FILTER
    );
    let total: i64 = sqlx::query(&count_sql)
        .bind(filter.user_id)
        .bind(filter.user_id)
        .bind(filter.edu_center_id)
        .bind(filter.edu_center_id)
        .bind(filter.branch_id)
        .bind(filter.branch_id)
        .fetch_one(pool)
        .await
        .context("Failed to count course registrations")?
        .get("count");

    Ok((rows.iter().map(row_to_registration_mysql).collect(), total))
}

fn row_to_registration_mysql(row: &sqlx::mysql::MySqlRow) -> CourseRegistration {
    CourseRegistration {
        id: row.get("id"),
        user_id: row.get("user_id"),
        edu_center_id: row.get("edu_center_id"),
        branch_id: row.get("branch_id"),
        subject_id: row.get("subject_id"),
        field_id: row.get("field_id"),
        user_full_name: row.get("user_full_name"),
        edu_center_name: row.get("edu_center_name"),
        branch_name: row.get("branch_name"),
        subject_name: row.get("subject_name"),
        field_name: row.get("field_name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{
        insert_branch, insert_catalog_item, insert_center, insert_region, insert_user,
        migrated_pool,
    };

    #[tokio::test]
    async fn test_registration_lifecycle() {
        let pool = migrated_pool().await;
        let region = insert_region(&pool, "Tashkent").await;
        let owner = insert_user(&pool, 1, "ceo").await;
        let student = insert_user(&pool, 2, "user").await;
        let center = insert_center(&pool, "Star", region, owner).await;
        let north = insert_branch(&pool, "North", region, center).await;
        let south = insert_branch(&pool, "South", region, center).await;
        let math = insert_catalog_item(&pool, "subjects", "Math").await;
        let it = insert_catalog_item(&pool, "fields", "IT").await;
        let repo = SqlxCourseRegistrationRepository::new(pool);

        let target = RegistrationTarget {
            edu_center_id: center,
            branch_id: north,
            subject_id: math,
            field_id: it,
        };
        let created = repo.create(student, &target).await.expect("Failed to create");
        assert_eq!(created.user_full_name, "User 2");
        assert_eq!(created.branch_name, "North");
        assert_eq!(created.subject_name, "Math");
        assert_eq!(created.target(), target);

        let moved = RegistrationTarget {
            branch_id: south,
            ..target
        };
        let updated = repo.update(created.id, &moved).await.unwrap();
        assert_eq!(updated.branch_name, "South");

        let mine = RegistrationFilter {
            user_id: Some(student),
            ..Default::default()
        };
        let (found, total) = repo.list(&mine, &ListParams::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].id, created.id);

        let others = RegistrationFilter {
            user_id: Some(owner),
            ..Default::default()
        };
        let (_, total) = repo.list(&others, &ListParams::default()).await.unwrap();
        assert_eq!(total, 0);

        repo.delete(created.id).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }
}
