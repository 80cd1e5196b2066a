//! Pagination block of a product list.

/// Position within a paged product list.
///
/// `has_next` and `has_prev` are derived from `page`, `limit` and `total`,
/// which come from [`Pagination::from_counts`] with the numbers of each fetch
/// response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    limit: u32,
    total: u64,
}

impl Pagination {
    /// Derive pagination from the counts of a list response.
    ///
    /// `page` and `limit` are clamped to at least 1.
    #[must_use]
    pub fn from_counts(page: u32, limit: u32, total: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
            total,
        }
    }

    /// Current (last loaded) page, starting at 1.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Page size.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Total number of products matching the filters.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Number of pages needed for `total` products.
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.limit)).max(1)
    }

    /// More pages remain after this one: `page * limit < total`.
    #[must_use]
    pub fn has_next(&self) -> bool {
        u64::from(self.page) * u64::from(self.limit) < self.total
    }

    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::from_counts(1, super::filters::DEFAULT_LIMIT, 0)
    }
}
