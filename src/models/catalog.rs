//! Subjects and fields
//!
//! Subjects (math, English, ...) and fields (IT, medicine, ...) share one
//! shape and one set of operations; [`CatalogKind`] selects the table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::pagination::sort_fields;

/// Which catalog a row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    Subject,
    Field,
}

impl CatalogKind {
    /// Catalog table
    pub fn table(&self) -> &'static str {
        match self {
            CatalogKind::Subject => "subjects",
            CatalogKind::Field => "fields",
        }
    }

    /// Column referencing this catalog from join tables
    pub fn id_column(&self) -> &'static str {
        match self {
            CatalogKind::Subject => "subject_id",
            CatalogKind::Field => "field_id",
        }
    }

    /// Join table linking centers to this catalog
    pub fn center_link_table(&self) -> &'static str {
        match self {
            CatalogKind::Subject => "edu_subjects",
            CatalogKind::Field => "edu_fields",
        }
    }

    /// Join table linking branches to this catalog
    pub fn branch_link_table(&self) -> &'static str {
        match self {
            CatalogKind::Subject => "branch_subjects",
            CatalogKind::Field => "branch_fields",
        }
    }

    /// Subdirectory of the upload root for images
    pub fn upload_dir(&self) -> &'static str {
        self.table()
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogKind::Subject => write!(f, "Subject"),
            CatalogKind::Field => write!(f, "Field"),
        }
    }
}

/// A subject or field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: i64,
    pub name: String,
    /// Image URL under `/uploads`
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a subject or field
#[derive(Debug, Clone, Default)]
pub struct UpdateCatalogInput {
    pub name: Option<String>,
    pub image: Option<String>,
}

sort_fields! {
    CatalogSort, default = Id,
    {
        Id => ("id", "id"),
        Name => ("name", "name"),
        CreatedAt => ("created_at", "created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_kind_tables() {
        assert_eq!(CatalogKind::Subject.table(), "subjects");
        assert_eq!(CatalogKind::Field.center_link_table(), "edu_fields");
        assert_eq!(CatalogKind::Subject.branch_link_table(), "branch_subjects");
        assert_eq!(CatalogKind::Field.id_column(), "field_id");
        assert_eq!(CatalogKind::Field.upload_dir(), "fields");
    }
}
