//! Region model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pagination::sort_fields;

/// A geographic region users, centers and branches belong to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

sort_fields! {
    RegionSort, default = Id,
    {
        Id => ("id", "id"),
        Name => ("name", "name"),
        CreatedAt => ("created_at", "created_at"),
    }
}
