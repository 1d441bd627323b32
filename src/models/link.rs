//! Center-to-catalog links (edu_subjects, edu_fields)

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::catalog::CatalogKind;
use super::pagination::sort_fields;

/// A center offering one subject or field.
///
/// Serialized with `subject_id` or `field_id` depending on the kind.
#[derive(Debug, Clone, Serialize)]
pub struct EduLink {
    pub id: i64,
    pub edu_center_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_id: Option<i64>,
    /// Name of the linked subject or field
    pub name: String,
    pub edu_center_name: String,
    pub created_at: DateTime<Utc>,
}

impl EduLink {
    pub fn new(
        kind: CatalogKind,
        id: i64,
        edu_center_id: i64,
        item_id: i64,
        name: String,
        edu_center_name: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        let (subject_id, field_id) = match kind {
            CatalogKind::Subject => (Some(item_id), None),
            CatalogKind::Field => (None, Some(item_id)),
        };
        Self {
            id,
            edu_center_id,
            subject_id,
            field_id,
            name,
            edu_center_name,
            created_at,
        }
    }

    /// The linked subject or field id
    pub fn item_id(&self) -> i64 {
        self.subject_id.or(self.field_id).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LinkFilter {
    pub edu_center_id: Option<i64>,
    /// Subject or field id, by kind
    pub item_id: Option<i64>,
}

sort_fields! {
    LinkSort, default = Id,
    {
        Id => ("id", "l.id"),
        CreatedAt => ("created_at", "l.created_at"),
    }
}
