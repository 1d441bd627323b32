//! Category model
//!
//! Categories group shared resources (books, videos, notes).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pagination::sort_fields;

/// Resource category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    /// Display name (unique)
    pub name: String,
    /// Image URL
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a category
#[derive(Debug, Clone, Default)]
pub struct UpdateCategoryInput {
    pub name: Option<String>,
    pub image: Option<String>,
}

sort_fields! {
    CategorySort, default = Id,
    {
        Id => ("id", "id"),
        Name => ("name", "name"),
        CreatedAt => ("created_at", "created_at"),
    }
}
