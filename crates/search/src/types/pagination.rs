//! Pagination types for search results.
//!
//! Pagination is page/per-page based. Both values are bounds-checked when
//! the intent is recorded, so the result assembler only ever sees a page of
//! at least 1 and a page size within the configured limits.

use serde::{Deserialize, Serialize};

use super::InventoryRecord;

/// Default number of records per page.
pub const DEFAULT_PER_PAGE: u32 = 25;

/// Upper bound on records per page.
pub const MAX_PER_PAGE: u32 = 100;

/// Pagination intent for a search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// One-based page number.
    pub page: u32,

    /// Maximum number of records on a page.
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl Pagination {
    /// Creates pagination clamped to `1..` pages and `1..=max_per_page` rows.
    pub fn new(page: u32, per_page: u32, max_per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, max_per_page.max(1)),
        }
    }

    /// Returns the row offset of the first record on this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }

    /// Returns the row limit.
    pub fn limit(&self) -> u64 {
        u64::from(self.per_page)
    }
}

/// A materialized page of inventory records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPage {
    /// Records on this page, at most `per_page` of them.
    pub records: Vec<InventoryRecord>,

    /// Number of distinct records matching the query, independent of `page`.
    pub total_count: u64,

    /// The page that was requested.
    pub page: u32,

    /// The page size that was applied.
    pub per_page: u32,
}

impl SearchPage {
    /// Returns the number of pages needed to show `total_count` records.
    pub fn total_pages(&self) -> u64 {
        if self.per_page == 0 {
            return 0;
        }
        self.total_count.div_ceil(u64::from(self.per_page))
    }

    /// Returns true if a later page has records.
    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_default() {
        let p = Pagination::default();
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, DEFAULT_PER_PAGE);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_pagination_clamps_bounds() {
        let p = Pagination::new(0, 0, MAX_PER_PAGE);
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, 1);

        let p = Pagination::new(3, 10_000, MAX_PER_PAGE);
        assert_eq!(p.per_page, MAX_PER_PAGE);
    }

    #[test]
    fn test_pagination_offset() {
        let p = Pagination::new(3, 20, MAX_PER_PAGE);
        assert_eq!(p.offset(), 40);
        assert_eq!(p.limit(), 20);
    }

    #[test]
    fn test_total_pages() {
        let page = SearchPage {
            records: vec![],
            total_count: 41,
            page: 2,
            per_page: 20,
        };
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());

        let last = SearchPage { page: 3, ..page };
        assert!(!last.has_next());
    }
}
