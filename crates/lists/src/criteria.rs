//! Collection queries over product lists.

use serde::{Deserialize, Serialize};

use crate::product_list::ProductList;

/// Default page size when a caller asks for pagination without a limit.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Upper bound applied to any requested page size.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Limit/offset pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of lists to return.
    pub limit: u32,
    /// Offset for pagination (0-based).
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
    /// Clamp the limit to `max` (configuration may lower the hard cap).
    pub fn capped(self, max: u32) -> Self {
        Self {
            limit: self.limit.min(max),
            offset: self.offset,
        }
    }
}

/// Filter for [`ProductListCollection`] queries.
///
/// Without pagination every list is returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductListCriteria {
    pub pagination: Option<Pagination>,
}

impl ProductListCriteria {
    pub fn paginated(limit: u32, offset: u32) -> Self {
        Self {
            pagination: Some(Pagination { limit, offset }),
        }
    }
}

/// A page of product lists, ordered by id ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductListCollection {
    pub product_lists: Vec<ProductList>,
    /// Total number of lists in storage (across all pages).
    pub total: u64,
    pub pagination: Option<Pagination>,
    pub has_more: bool,
}

impl ProductListCollection {
    pub fn new(product_lists: Vec<ProductList>, total: u64, pagination: Option<Pagination>) -> Self {
        let has_more = match pagination {
            Some(p) => u64::from(p.offset) + (product_lists.len() as u64) < total,
            None => false,
        };
        Self {
            product_lists,
            total,
            pagination,
            has_more,
        }
    }
}
