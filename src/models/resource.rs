//! Resource model
//!
//! A resource is a piece of learning material shared by a user under a
//! category.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pagination::sort_fields;

/// Shared learning material, with its author and category names joined in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: i64,
    pub name: String,
    /// Media URL
    pub media: String,
    pub description: String,
    pub category_id: i64,
    pub user_id: i64,
    pub category_name: String,
    pub user_full_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new resource
#[derive(Debug, Clone)]
pub struct NewResource {
    pub name: String,
    pub media: String,
    pub description: String,
    pub category_id: i64,
    pub user_id: i64,
}

/// Partial update of a resource
#[derive(Debug, Clone, Default)]
pub struct UpdateResourceInput {
    pub name: Option<String>,
    pub media: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
}

impl UpdateResourceInput {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.media.is_none()
            && self.description.is_none()
            && self.category_id.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    pub category_id: Option<i64>,
    pub user_id: Option<i64>,
}

sort_fields! {
    ResourceSort, default = Id,
    {
        Id => ("id", "r.id"),
        Name => ("name", "r.name"),
        CreatedAt => ("created_at", "r.created_at"),
    }
}
