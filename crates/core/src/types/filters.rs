//! List filters: search term, sort order, category path and page size.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Page size used when nothing else is configured.
pub const DEFAULT_LIMIT: u32 = 20;

/// Page sizes offered by the limit selector.
pub const LIMIT_OPTIONS: [u32; 4] = [10, 20, 50, 100];

/// Error parsing a sort order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown sort order: {0}")]
pub struct SortOrderError(pub String);

/// Sort orders understood by the product API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
}

impl SortOrder {
    pub const ALL: [Self; 4] = [Self::PriceAsc, Self::PriceDesc, Self::NameAsc, Self::NameDesc];

    /// Wire value, as used in query strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::NameAsc => "name_asc",
            Self::NameDesc => "name_desc",
        }
    }

    /// Label shown in the sort selector.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PriceAsc => "가격 낮은순",
            Self::PriceDesc => "가격 높은순",
            Self::NameAsc => "이름순",
            Self::NameDesc => "이름 역순",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = SortOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|order| order.as_str() == s)
            .ok_or_else(|| SortOrderError(s.to_string()))
    }
}

/// Filters applied to the product list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilters {
    /// Trimmed search term; empty means no search.
    pub search: String,
    pub sort: SortOrder,
    pub category1: Option<String>,
    /// Only meaningful together with `category1`.
    pub category2: Option<String>,
    pub limit: u32,
}

impl Default for ListFilters {
    fn default() -> Self {
        Self {
            search: String::new(),
            sort: SortOrder::default(),
            category1: None,
            category2: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ListFilters {
    /// Whether `limit` is one of the selectable page sizes.
    #[must_use]
    pub fn is_valid_limit(limit: u32) -> bool {
        LIMIT_OPTIONS.contains(&limit)
    }

    /// Set the search term, trimming surrounding whitespace.
    pub fn set_search(&mut self, search: &str) {
        search.trim().clone_into(&mut self.search);
    }

    /// Select a top-level category, dropping any second-level selection.
    pub fn select_category1(&mut self, category1: impl Into<String>) {
        self.category1 = non_empty(category1.into());
        self.category2 = None;
    }

    /// Select a second-level category below the current top-level one.
    ///
    /// Ignored when no top-level category is selected.
    pub fn select_category2(&mut self, category2: impl Into<String>) {
        if self.category1.is_some() {
            self.category2 = non_empty(category2.into());
        }
    }

    /// Clear both category levels (the breadcrumb "전체" button).
    pub fn reset_categories(&mut self) {
        self.category1 = None;
        self.category2 = None;
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_order_round_trip_names() {
        for order in SortOrder::ALL {
            assert_eq!(order.as_str().parse::<SortOrder>().unwrap(), order);
        }
        assert_eq!(
            "cheapest".parse::<SortOrder>(),
            Err(SortOrderError("cheapest".to_string()))
        );
    }

    #[test]
    fn test_category_selection() {
        let mut filters = ListFilters::default();

        filters.select_category2("생활용품");
        assert_eq!(filters.category2, None, "category2 needs a category1");

        filters.select_category1("생활/건강");
        filters.select_category2("생활용품");
        assert_eq!(filters.category2.as_deref(), Some("생활용품"));

        filters.select_category1("디지털/가전");
        assert_eq!(filters.category2, None, "changing category1 resets category2");

        filters.reset_categories();
        assert_eq!(filters.category1, None);
    }

    #[test]
    fn test_search_is_trimmed() {
        let mut filters = ListFilters::default();
        filters.set_search("  젤리 ");
        assert_eq!(filters.search, "젤리");
    }

    #[test]
    fn test_valid_limits() {
        assert!(ListFilters::is_valid_limit(50));
        assert!(!ListFilters::is_valid_limit(25));
    }
}
