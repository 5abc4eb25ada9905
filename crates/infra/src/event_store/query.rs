//! Paginated stream reads.

use serde::{Deserialize, Serialize};

use super::r#trait::StoreError;

/// Default page size when none is given.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Hard upper bound on a page, whatever the configuration says.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Pagination parameters for stream reads (oldest-first order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of events to return.
    pub limit: u32,
    /// Number of events to skip (0-based).
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE),
            offset: offset.unwrap_or(0),
        }
    }

    /// The page following this one.
    pub fn next(self) -> Self {
        Self {
            offset: self.offset.saturating_add(self.limit),
            ..self
        }
    }

    /// Validate the page and clamp its limit to `max_page_size`.
    pub(crate) fn capped(self, max_page_size: u32) -> Result<Self, StoreError> {
        if self.limit == 0 {
            return Err(StoreError::invalid_argument("page limit must be greater than zero"));
        }
        Ok(Self {
            limit: self.limit.min(max_page_size.min(MAX_PAGE_SIZE)),
            ..self
        })
    }
}
