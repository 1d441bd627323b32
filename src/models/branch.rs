//! Branch model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::CatalogItem;
use super::pagination::sort_fields;

/// A branch location of an education center
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub phone: String,
    pub location: String,
    pub region_id: i64,
    pub edu_center_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A branch with the subjects and fields it teaches
#[derive(Debug, Clone, Serialize)]
pub struct BranchDetails {
    #[serde(flatten)]
    pub branch: Branch,
    pub subjects: Vec<CatalogItem>,
    pub fields: Vec<CatalogItem>,
}

#[derive(Debug, Clone)]
pub struct NewBranch {
    pub name: String,
    pub image: String,
    pub phone: String,
    pub location: String,
    pub region_id: i64,
    pub edu_center_id: i64,
    pub subject_ids: Vec<i64>,
    pub field_ids: Vec<i64>,
}

/// Partial update of a branch; link lists replace the current ones
#[derive(Debug, Clone, Default)]
pub struct UpdateBranchInput {
    pub name: Option<String>,
    pub image: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub region_id: Option<i64>,
    pub subject_ids: Option<Vec<i64>>,
    pub field_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default)]
pub struct BranchFilter {
    pub edu_center_id: Option<i64>,
    pub region_id: Option<i64>,
}

sort_fields! {
    BranchSort, default = Id,
    {
        Id => ("id", "id"),
        Name => ("name", "name"),
        CreatedAt => ("created_at", "created_at"),
    }
}
