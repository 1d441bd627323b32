//! Education center model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::branch::Branch;
use super::catalog::CatalogItem;
use super::pagination::sort_fields;

/// An education center listing, owned by a user (usually a CEO)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EduCenter {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub phone: String,
    pub license: String,
    pub address: Option<String>,
    pub region_id: i64,
    /// Owner
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A center with everything shown on its detail page
#[derive(Debug, Clone, Serialize)]
pub struct EduCenterDetails {
    #[serde(flatten)]
    pub center: EduCenter,
    pub region_name: Option<String>,
    pub owner_name: Option<String>,
    pub subjects: Vec<CatalogItem>,
    pub fields: Vec<CatalogItem>,
    pub branches: Vec<Branch>,
    /// Average comment star, `None` without comments
    pub rating: Option<f64>,
    pub comment_count: i64,
    pub like_count: i64,
}

/// Fields for a new center plus the catalog rows it offers
#[derive(Debug, Clone)]
pub struct NewEduCenter {
    pub name: String,
    pub image: String,
    pub phone: String,
    pub license: String,
    pub address: Option<String>,
    pub region_id: i64,
    pub user_id: i64,
    pub subject_ids: Vec<i64>,
    pub field_ids: Vec<i64>,
}

/// Partial update of a center.
///
/// `subject_ids`/`field_ids`, when present, replace the current links.
#[derive(Debug, Clone, Default)]
pub struct UpdateEduCenterInput {
    pub name: Option<String>,
    pub image: Option<String>,
    pub phone: Option<String>,
    pub license: Option<String>,
    pub address: Option<String>,
    pub region_id: Option<i64>,
    pub user_id: Option<i64>,
    pub subject_ids: Option<Vec<i64>>,
    pub field_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default)]
pub struct EduCenterFilter {
    pub region_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub field_id: Option<i64>,
    pub user_id: Option<i64>,
}

sort_fields! {
    EduCenterSort, default = Id,
    {
        Id => ("id", "c.id"),
        Name => ("name", "c.name"),
        CreatedAt => ("created_at", "c.created_at"),
    }
}
