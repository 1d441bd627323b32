//! Common API utilities and shared types
//!
//! This module contains shared utilities used across multiple API endpoints.

use serde::{Deserialize, Serialize};
use validator::ValidationError;

use crate::api::middleware::ApiError;
use crate::services::error::PHONE;
use crate::models::{ListParams, SortField, SortOrder, DEFAULT_LIMIT};

// ============================================================================
// Pagination Defaults
// ============================================================================

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Default page size
pub fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

// ============================================================================
// List Query
// ============================================================================

/// `page`, `limit`, `search`, `sort` and `order` accepted by every list
/// endpoint. Module filters come from a separate query extractor.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            search: None,
            sort: None,
            order: None,
        }
    }
}

impl ListQuery {
    /// Resolve into list parameters, rejecting sort keys outside `S::ALLOWED`
    pub fn to_params<S: SortField>(&self) -> Result<ListParams<S>, ApiError> {
        let sort = match self.sort.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => S::default(),
            Some(key) => S::parse(key).ok_or_else(|| {
                ApiError::with_details(
                    "VALIDATION_ERROR",
                    format!("Cannot sort by '{}'", key),
                    serde_json::json!({ "allowed": S::ALLOWED }),
                )
            })?,
        };

        let order = match self.order.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => SortOrder::default(),
            Some(value) => value.parse::<SortOrder>().map_err(|_| {
                ApiError::with_details(
                    "VALIDATION_ERROR",
                    format!("Invalid sort order '{}'", value),
                    serde_json::json!({ "allowed": ["asc", "desc"] }),
                )
            })?,
        };

        Ok(ListParams::new(self.page, self.limit)
            .with_search(self.search.clone())
            .with_sort(sort, order))
    }
}

// ============================================================================
// Responses
// ============================================================================

/// `{"message": "..."}` body returned by deletes and other acknowledgements
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `+` followed by exactly 12 digits
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if PHONE.is_match(phone) {
        Ok(())
    } else {
        let mut error = ValidationError::new("phone");
        error.message = Some("phone must look like +998901234567".into());
        Err(error)
    }
}
