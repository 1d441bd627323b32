//! Pagination, search and sorting for list endpoints
//!
//! Every list operation takes a [`ListParams`] and returns a [`PagedResult`].
//! Sorting is restricted to a per-entity whitelist expressed as a
//! [`SortField`] enum, so the column name interpolated into SQL never comes
//! from user input.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Default page size
pub const DEFAULT_LIMIT: u32 = 10;
/// Largest accepted page size
pub const MAX_LIMIT: u32 = 100;

/// A whitelisted sort key for one entity.
pub trait SortField: Copy + Default + Send + Sync + 'static {
    /// Names accepted in the `sort` query parameter
    const ALLOWED: &'static [&'static str];

    /// SQL column (possibly alias-qualified) for this key
    fn column(&self) -> &'static str;

    /// Parse a `sort` query value
    fn parse(value: &str) -> Option<Self>;
}

/// Declares a [`SortField`] enum mapping query names to SQL columns.
macro_rules! sort_fields {
    (
        $(#[$meta:meta])*
        $name:ident, default = $default:ident,
        { $($variant:ident => ($key:literal, $column:literal)),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl $crate::models::SortField for $name {
            const ALLOWED: &'static [&'static str] = &[$($key),+];

            fn column(&self) -> &'static str {
                match self {
                    $(Self::$variant => $column),+
                }
            }

            fn parse(value: &str) -> Option<Self> {
                match value {
                    $($key => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

pub(crate) use sort_fields;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(anyhow::anyhow!("Invalid sort order: {}", s)),
        }
    }
}

/// Pagination, search and sort parameters for a list query.
#[derive(Debug, Clone)]
pub struct ListParams<S: SortField> {
    /// Page number (1-indexed)
    pub page: u32,
    /// Items per page (1..=100)
    pub limit: u32,
    /// Trimmed, non-empty search term
    pub search: Option<String>,
    pub sort: S,
    pub order: SortOrder,
}

impl<S: SortField> Default for ListParams<S> {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
            search: None,
            sort: S::default(),
            order: SortOrder::default(),
        }
    }
}

impl<S: SortField> ListParams<S> {
    /// Create pagination parameters, clamping page and limit into range
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_LIMIT),
            ..Self::default()
        }
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }

    pub fn with_sort(mut self, sort: S, order: SortOrder) -> Self {
        self.sort = sort;
        self.order = order;
        self
    }

    /// Row offset for `LIMIT ? OFFSET ?`
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.limit as i64
    }

    /// Page size for `LIMIT ? OFFSET ?`
    pub fn limit(&self) -> i64 {
        self.limit as i64
    }

    /// `LIKE` pattern matching the search term anywhere
    pub fn contains_pattern(&self) -> Option<String> {
        self.search.as_ref().map(|s| format!("%{}%", escape_like(s)))
    }

    /// `LIKE` pattern matching names that start with the search term
    pub fn prefix_pattern(&self) -> Option<String> {
        self.search.as_ref().map(|s| format!("{}%", escape_like(s)))
    }

    /// `ORDER BY` body built from the whitelisted column
    pub fn order_by(&self) -> String {
        format!("{} {}", self.sort.column(), self.order.as_sql())
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// One page of results plus totals
#[derive(Debug, Clone, Serialize)]
pub struct PagedResult<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> PagedResult<T> {
    pub fn new<S: SortField>(data: Vec<T>, total: i64, params: &ListParams<S>) -> Self {
        let total_pages = if total <= 0 {
            0
        } else {
            ((total as u64 + params.limit as u64 - 1) / params.limit as u64) as u32
        };

        Self {
            data,
            total,
            page: params.page,
            limit: params.limit,
            total_pages,
        }
    }

    /// Transform every item while keeping the totals
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
