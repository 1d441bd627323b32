//! Errors shared by the directory services

use crate::db::{is_foreign_key_violation, is_unique_violation};
use once_cell::sync::Lazy;
use regex::Regex;

/// `+` followed by exactly twelve digits
pub(crate) static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+\d{12}$").expect("phone pattern is a valid regex"));

/// Error types for directory service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    /// Invalid input, including references to rows that do not exist
    #[error("{0}")]
    Validation(String),

    /// Duplicate value or a row that is still referenced
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn not_found(what: &str, id: i64) -> Self {
        ServiceError::NotFound(format!("{} {} not found", what, id))
    }

    /// Classify a failed insert or update.
    ///
    /// Unique violations become `Conflict(conflict)`, foreign key violations
    /// become `Validation`, everything else stays internal.
    pub fn from_write(err: anyhow::Error, conflict: impl Into<String>) -> Self {
        if is_unique_violation(&err) {
            ServiceError::Conflict(conflict.into())
        } else if is_foreign_key_violation(&err) {
            ServiceError::Validation("Referenced record does not exist".to_string())
        } else {
            ServiceError::Internal(err)
        }
    }
}

/// Reject a blank or out-of-range text value
pub(crate) fn check_length(field: &str, value: &str, min: usize, max: usize) -> ServiceResult<String> {
    let value = value.trim();
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ServiceError::Validation(format!(
            "{} must be between {} and {} characters",
            field, min, max
        )));
    }
    Ok(value.to_string())
}

/// Phone numbers are `+` followed by twelve digits
pub(crate) fn check_phone(value: &str) -> ServiceResult<String> {
    let value = value.trim();
    if !PHONE.is_match(value) {
        return Err(ServiceError::Validation(
            "phone must look like +998901234567".to_string(),
        ));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_length_trims() {
        assert_eq!(check_length("name", "  Math  ", 2, 55).unwrap(), "Math");
        assert!(matches!(
            check_length("name", " a ", 2, 55),
            Err(ServiceError::Validation(msg)) if msg == "name must be between 2 and 55 characters"
        ));
        assert!(check_length("name", &"x".repeat(56), 2, 55).is_err());
    }

    #[test]
    fn test_check_phone() {
        assert_eq!(check_phone(" +998901234567 ").unwrap(), "+998901234567");
        assert!(check_phone("998901234567").is_err());
        assert!(check_phone("+99890123456").is_err());
        assert!(check_phone("+99890123456a").is_err());
    }

    #[test]
    fn test_from_write_keeps_other_errors_internal() {
        let err = ServiceError::from_write(anyhow::anyhow!("disk full"), "dup");
        assert!(matches!(err, ServiceError::Internal(_)));
    }
}
