//! Comment repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Comment, CommentFilter, CommentSort, ListParams};

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new comment
    async fn create(&self, user_id: i64, edu_center_id: i64, comment: &str, star: i32) -> Result<Comment>;

    /// Get a comment by ID, with its author's name
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Write text and star
    async fn update(&self, comment: &Comment) -> Result<Comment>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn list(
        &self,
        filter: &CommentFilter,
        params: &ListParams<CommentSort>,
    ) -> Result<(Vec<Comment>, i64)>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

const COMMENT_SELECT: &str = r#"
    SELECT cm.id, cm.user_id, cm.edu_center_id, cm.comment, cm.star,
           u.full_name AS user_full_name, cm.created_at, cm.updated_at
    FROM comments cm
    JOIN users u ON u.id = cm.user_id
"#;

const COMMENT_FILTER: &str = r#"
    WHERE (? IS NULL OR cm.edu_center_id = ?)
      AND (? IS NULL OR cm.user_id = ?)
      AND (? IS NULL OR cm.star = ?)
"#;

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, user_id: i64, edu_center_id: i64, comment: &str, star: i32) -> Result<Comment> {
        let now = Utc::now();
        let sql = r#"
            INSERT INTO comments (user_id, edu_center_id, comment, star, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
        "#;
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(user_id)
                .bind(edu_center_id)
                .bind(comment)
                .bind(star)
                .bind(now)
                .bind(now)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to create comment")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(user_id)
                .bind(edu_center_id)
                .bind(comment)
                .bind(star)
                .bind(now)
                .bind(now)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to create comment")?
                .last_insert_id() as i64,
        };

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Comment not found after insert"))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn update(&self, comment: &Comment) -> Result<Comment> {
        let sql = "UPDATE comments SET comment = ?, star = ?, updated_at = ? WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&comment.comment)
                    .bind(comment.star)
                    .bind(Utc::now())
                    .bind(comment.id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to update comment")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&comment.comment)
                    .bind(comment.star)
                    .bind(Utc::now())
                    .bind(comment.id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to update comment")?;
            }
        }

        self.get_by_id(comment.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Comment not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("DELETE FROM comments WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to delete comment")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query("DELETE FROM comments WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to delete comment")?;
            }
        }
        Ok(())
    }

    async fn list(
        &self,
        filter: &CommentFilter,
        params: &ListParams<CommentSort>,
    ) -> Result<(Vec<Comment>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sqlite(self.pool.sqlite()?, filter, params).await,
            DatabaseDriver::Mysql => list_mysql(self.pool.mysql()?, filter, params).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query(&format!("{} WHERE cm.id = ?", COMMENT_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment by ID")?;

    Ok(row.as_ref().map(row_to_comment_sqlite))
}

async fn list_sqlite(
    pool: &SqlitePool,
    filter: &CommentFilter,
    params: &ListParams<CommentSort>,
) -> Result<(Vec<Comment>, i64)> {
    let search = r#"AND (? IS NULL OR cm.comment LIKE ? ESCAPE '\')"#;
    let pattern = params.contains_pattern();

    let sql = format!(
        "{} {} {} ORDER BY {} LIMIT ? OFFSET ?",
        COMMENT_SELECT,
        COMMENT_FILTER,
        search,
        params.order_by()
    );
    let rows = sqlx::query(&sql)
        .bind(filter.edu_center_id)
        .bind(filter.edu_center_id)
        .bind(filter.user_id)
        .bind(filter.user_id)
        .bind(filter.star)
        .bind(filter.star)
        .bind(&pattern)
        .bind(&pattern)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    let count_sql = format!("SELECT COUNT(*) as count FROM comments cm {} {}", COMMENT_FILTER, search);
    let total: i64 = sqlx::query(&count_sql)
        .bind(filter.edu_center_id)
        .bind(filter.edu_center_id)
        .bind(filter.user_id)
        .bind(filter.user_id)
        .bind(filter.star)
        .bind(filter.star)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_one(pool)
        .await
        .context("Failed to count comments")?
        .get("count");

    Ok((rows.iter().map(row_to_comment_sqlite).collect(), total))
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        user_id: row.get("user_id"),
        edu_center_id: row.get("edu_center_id"),
        comment: row.get("comment"),
        star: row.get("star"),
        user_full_name: row.get("user_full_name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query(&format!("{} WHERE cm.id = ?", COMMENT_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment by ID")?;

    Ok(row.as_ref().map(row_to_comment_mysql))
}

async fn list_mysql(
    pool: &MySqlPool,
    filter: &CommentFilter,
    params: &ListParams<CommentSort>,
) -> Result<(Vec<Comment>, i64)> {
    let search = "AND (? IS NULL OR cm.comment LIKE ?)";
    let pattern = params.contains_pattern();

    let sql = format!(
        "{} {} {} ORDER BY {} LIMIT ? OFFSET ?",
        COMMENT_SELECT,
        COMMENT_FILTER,
        search,
        params.order_by()
    );
    let rows = sqlx::query(&sql)
        .bind(filter.edu_center_id)
        .bind(filter.edu_center_id)
        .bind(filter.user_id)
        .bind(filter.user_id)
        .bind(filter.star)
        .bind(filter.star)
        .bind(&pattern)
        .bind(&pattern)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    let count_sql = format!("SELECT COUNT(*) as count FROM comments cm {} {}", COMMENT_FILTER, search);
    let total: i64 = sqlx::query(&count_sql)
        .bind(filter.edu_center_id)
        .bind(filter.edu_center_id)
        .bind(filter.user_id)
        .bind(filter.user_id)
        .bind(filter.star)
        .bind(filter.star)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_one(pool)
        .await
        .context("Failed to count comments")?
        .get("count");

    Ok((rows.iter().map(row_to_comment_mysql).collect(), total))
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Comment {
    Comment {
        id: row.get("id"),
        user_id: row.get("user_id"),
        edu_center_id: row.get("edu_center_id"),
        comment: row.get("comment"),
        star: row.get("star"),
        user_full_name: row.get("user_full_name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
