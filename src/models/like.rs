//! Like model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pagination::sort_fields;

/// A user liking an education center (at most once)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Like {
    pub id: i64,
    pub user_id: i64,
    pub edu_center_id: i64,
    pub user_full_name: String,
    pub edu_center_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct LikeFilter {
    pub user_id: Option<i64>,
    pub edu_center_id: Option<i64>,
}

sort_fields! {
    LikeSort, default = Id,
    {
        Id => ("id", "lk.id"),
        CreatedAt => ("created_at", "lk.created_at"),
    }
}
