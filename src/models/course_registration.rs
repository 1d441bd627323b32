//! Course registration model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pagination::sort_fields;

/// A user's enrollment request for a subject/field at a center branch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRegistration {
    pub id: i64,
    pub user_id: i64,
    pub edu_center_id: i64,
    pub branch_id: i64,
    pub subject_id: i64,
    pub field_id: i64,
    pub user_full_name: String,
    pub edu_center_name: String,
    pub branch_name: String,
    pub subject_name: String,
    pub field_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// References of a registration, checked together before writing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationTarget {
    pub edu_center_id: i64,
    pub branch_id: i64,
    pub subject_id: i64,
    pub field_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateRegistrationInput {
    pub edu_center_id: Option<i64>,
    pub branch_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub field_id: Option<i64>,
}

impl UpdateRegistrationInput {
    pub fn is_empty(&self) -> bool {
        self.edu_center_id.is_none()
            && self.branch_id.is_none()
            && self.subject_id.is_none()
            && self.field_id.is_none()
    }

    /// Overlay this update on an existing target
    pub fn apply_to(&self, current: RegistrationTarget) -> RegistrationTarget {
        RegistrationTarget {
            edu_center_id: self.edu_center_id.unwrap_or(current.edu_center_id),
            branch_id: self.branch_id.unwrap_or(current.branch_id),
            subject_id: self.subject_id.unwrap_or(current.subject_id),
            field_id: self.field_id.unwrap_or(current.field_id),
        }
    }
}

impl CourseRegistration {
    pub fn target(&self) -> RegistrationTarget {
        RegistrationTarget {
            edu_center_id: self.edu_center_id,
            branch_id: self.branch_id,
            subject_id: self.subject_id,
            field_id: self.field_id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegistrationFilter {
    pub user_id: Option<i64>,
    pub edu_center_id: Option<i64>,
    pub branch_id: Option<i64>,
}

sort_fields! {
    RegistrationSort, default = Id,
    {
        Id => ("id", "cr.id"),
        CreatedAt => ("created_at", "cr.created_at"),
    }
}
