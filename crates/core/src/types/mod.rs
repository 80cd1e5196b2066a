//! Core types for Pocket Mall.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod filters;
pub mod id;
pub mod pagination;
pub mod price;
pub mod product;

pub use filters::{DEFAULT_LIMIT, LIMIT_OPTIONS, ListFilters, SortOrder, SortOrderError};
pub use id::ProductId;
pub use pagination::Pagination;
pub use price::Price;
pub use product::{Categories, Product, ProductDetail};
