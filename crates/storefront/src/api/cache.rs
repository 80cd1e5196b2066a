//! Cache types for product API responses.

use pocket_mall_core::{Categories, ProductDetail, ProductId};

use super::ProductPage;

/// Cache key for list pages, single products and the category tree.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    /// Keyed by the full API query string.
    Products(String),
    Product(ProductId),
    Categories,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(ProductPage),
    Product(Box<ProductDetail>),
    Categories(Categories),
}
