//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pagination::sort_fields;

/// Lowest accepted rating
pub const MIN_STAR: i32 = 0;
/// Highest accepted rating
pub const MAX_STAR: i32 = 5;

/// A rated review of an education center
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub user_id: i64,
    pub edu_center_id: i64,
    pub comment: String,
    pub star: i32,
    pub user_full_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCommentInput {
    pub comment: Option<String>,
    pub star: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    pub edu_center_id: Option<i64>,
    pub user_id: Option<i64>,
    pub star: Option<i32>,
}

sort_fields! {
    CommentSort, default = Id,
    {
        Id => ("id", "cm.id"),
        Star => ("star", "cm.star"),
        CreatedAt => ("created_at", "cm.created_at"),
    }
}
