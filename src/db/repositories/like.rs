//! Like repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Like, LikeFilter, LikeSort, ListParams};

#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// Insert a like; a second like of the same center is a unique violation
    async fn create(&self, user_id: i64, edu_center_id: i64) -> Result<Like>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Like>>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn list(&self, filter: &LikeFilter, params: &ListParams<LikeSort>) -> Result<(Vec<Like>, i64)>;
}

/// SQLx-based like repository implementation
pub struct SqlxLikeRepository {
    pool: DynDatabasePool,
}

impl SqlxLikeRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn LikeRepository> {
        Arc::new(Self::new(pool))
    }
}

const LIKE_SELECT: &str = r#"
    SELECT lk.id, lk.user_id, lk.edu_center_id, u.full_name AS user_full_name,
           c.name AS edu_center_name, lk.created_at
    FROM likes lk
    JOIN users u ON u.id = lk.user_id
    JOIN edu_centers c ON c.id = lk.edu_center_id
"#;

const LIKE_FILTER: &str = "WHERE (? IS NULL OR lk.user_id = ?) AND (? IS NULL OR lk.edu_center_id = ?)";

#[async_trait]
impl LikeRepository for SqlxLikeRepository {
    async fn create(&self, user_id: i64, edu_center_id: i64) -> Result<Like> {
        let sql = "INSERT INTO likes (user_id, edu_center_id, created_at) VALUES (?, ?, ?)";
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(user_id)
                .bind(edu_center_id)
                .bind(Utc::now())
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to create like")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(user_id)
                .bind(edu_center_id)
                .bind(Utc::now())
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to create like")?
                .last_insert_id() as i64,
        };

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Like not found after insert"))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Like>> {
        let sql = format!("{} WHERE lk.id = ?", LIKE_SELECT);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get like")?;
                Ok(row.as_ref().map(row_to_like_sqlite))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get like")?;
                Ok(row.as_ref().map(row_to_like_mysql))
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("DELETE FROM likes WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to delete like")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query("DELETE FROM likes WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to delete like")?;
            }
        }
        Ok(())
    }

    async fn list(&self, filter: &LikeFilter, params: &ListParams<LikeSort>) -> Result<(Vec<Like>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_likes_sqlite(self.pool.sqlite()?, filter, params).await,
            DatabaseDriver::Mysql => list_likes_mysql(self.pool.mysql()?, filter, params).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn list_likes_sqlite(
    pool: &SqlitePool,
    filter: &LikeFilter,
    params: &ListParams<LikeSort>,
) -> Result<(Vec<Like>, i64)> {
    let sql = format!("{} {} ORDER BY {} LIMIT ? OFFSET ?", LIKE_SELECT, LIKE_FILTER, params.order_by());
    let rows = sqlx::query(&sql)
        .bind(filter.user_id)
        .bind(filter.user_id)
        .bind(filter.edu_center_id)
        .bind(filter.edu_center_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list likes")?;

    let total: i64 = sqlx::query(&format!("SELECT COUNT(*) as count FROM likes lk {}", LIKE_FILTER))
        .bind(filter.user_id)
        .bind(filter.user_id)
        .bind(filter.edu_center_id)
        .bind(filter.edu_center_id)
        .fetch_one(pool)
        .await
        .context("Failed to count likes")?
        .get("count");

    Ok((rows.iter().map(row_to_like_sqlite).collect(), total))
}

fn row_to_like_sqlite(row: &sqlx::sqlite::SqliteRow) -> Like {
    Like {
        id: row.get("id"),
        user_id: row.get("user_id"),
        edu_center_id: row.get("edu_center_id"),
        user_full_name: row.get("user_full_name"),
        edu_center_name: row.get("edu_center_name"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn list_likes_mysql(
    pool: &MySqlPool,
    filter: &LikeFilter,
    params: &ListParams<LikeSort>,
) -> Result<(Vec<Like>, i64)> {
    let sql = format!("{} {} ORDER BY {} LIMIT ? OFFSET ?", LIKE_SELECT, LIKE_FILTER, params.order_by());
    let rows = sqlx::query(&sql)
        .bind(filter.user_id)
        .bind(filter.user_id)
        .bind(filter.edu_center_id)
        .bind(filter.edu_center_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list likes")?;

    let total: i64 = sqlx::query(&format!("SELECT COUNT(*) as count FROM likes lk {}", LIKE_FILTER))
        .bind(filter.user_id)
        .bind(filter.user_id)
        .bind(filter.edu_center_id)
        .bind(filter.edu_center_id)
        .fetch_one(pool)
        .await
        .context("Failed to count likes")?
        .get("count");

    Ok((rows.iter().map(row_to_like_mysql).collect(), total))
}

fn row_to_like_mysql(row: &sqlx::mysql::MySqlRow) -> Like {
    Like {
        id: row.get("id"),
        user_id: row.get("user_id"),
        edu_center_id: row.get("edu_center_id"),
        user_full_name: row.get("user_full_name"),
        edu_center_name: row.get("edu_center_name"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{
        insert_center, insert_region, insert_user, migrated_pool,
    };

    #[tokio::test]
    async fn test_like_once_per_center() {
        let pool = migrated_pool().await;
        let region = insert_region(&pool, "Tashkent").await;
        let owner = insert_user(&pool, 1, "ceo").await;
        let fan = insert_user(&pool, 2, "user").await;
        let center = insert_center(&pool, "Star", region, owner).await;
        let repo = SqlxLikeRepository::new(pool);

        let like = repo.create(fan, center).await.expect("Failed to like");
        assert_eq!(like.edu_center_name, "Star");
        assert_eq!(like.user_full_name, "User 2");

        let again = repo.create(fan, center).await;
        assert!(again.as_ref().is_err_and(crate::db::is_unique_violation));

        repo.create(owner, center).await.unwrap();
        let filter = LikeFilter {
            edu_center_id: Some(center),
            ..Default::default()
        };
        let (_, total) = repo.list(&filter, &ListParams::default()).await.unwrap();
        assert_eq!(total, 2);

        repo.delete(like.id).await.unwrap();
        assert!(repo.get_by_id(like.id).await.unwrap().is_none());
    }
}
