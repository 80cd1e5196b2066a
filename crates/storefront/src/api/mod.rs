//! Product API client.
//!
//! The product API is a small JSON service:
//!
//! - `GET /api/products?page&limit&sort&search&category1&category2`
//!   returns `{ products, pagination, filters }`
//! - `GET /api/products/{id}` returns one product with detail fields, 404 if unknown
//! - `GET /api/categories` returns the two-level category tree
//!
//! Responses are cached in memory with `moka`. Search results are not cached.
//! The pagination block of a list response is reduced to its counts; the
//! derived flags are recomputed locally.

mod cache;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use pocket_mall_core::{Categories, ListQuery, Pagination, Product, ProductDetail, ProductId};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use cache::{CacheKey, CacheValue};

/// Errors that can occur when calling the product API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an unexpected status.
    #[error("Product API returned {status} for {url}")]
    Status { status: StatusCode, url: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// One page of the product list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub pagination: Pagination,
}

#[derive(Deserialize)]
struct ProductsResponse {
    products: Vec<Product>,
    pagination: PaginationBlock,
}

#[derive(Deserialize)]
struct PaginationBlock {
    page: u32,
    limit: u32,
    total: u64,
}

/// Client for the product API.
///
/// Cheaply cloneable; clones share the HTTP client and the cache.
#[derive(Clone)]
pub struct ProductApi {
    inner: Arc<ProductApiInner>,
}

struct ProductApiInner {
    client: reqwest::Client,
    base_url: String,
    cache: Option<Cache<CacheKey, CacheValue>>,
}

impl std::fmt::Debug for ProductApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductApi")
            .field("base_url", &self.inner.base_url)
            .field("cached", &self.inner.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl ProductApi {
    /// Create a client for the API at `base_url`.
    ///
    /// `cache_ttl` of `None` disables caching.
    #[must_use]
    pub fn new(base_url: &Url, cache_ttl: Option<Duration>) -> Self {
        let cache = cache_ttl.map(|ttl| Cache::builder().max_capacity(1000).time_to_live(ttl).build());

        Self {
            inner: Arc::new(ProductApiInner {
                client: reqwest::Client::new(),
                base_url: base_url.as_str().trim_end_matches('/').to_string(),
                cache,
            }),
        }
    }

    async fn cached(&self, key: &CacheKey) -> Option<CacheValue> {
        match &self.inner.cache {
            Some(cache) => cache.get(key).await,
            None => None,
        }
    }

    async fn remember(&self, key: CacheKey, value: CacheValue) {
        if let Some(cache) = &self.inner.cache {
            cache.insert(key, value).await;
        }
    }

    /// GET `path` and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{path}", self.inner.base_url);

        let response = self
            .inner
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(path.to_string()));
        }

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Product API returned non-success status"
            );
            return Err(ApiError::Status { status, url });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse product API response"
            );
            ApiError::Parse(e)
        })
    }

    /// Get one page of the product list.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the body does not parse.
    #[instrument(skip(self, query), fields(page = query.page, limit = query.filters.limit))]
    pub async fn get_products(&self, query: &ListQuery) -> Result<ProductPage, ApiError> {
        let api_query = query.to_api_query();
        let cache_key = CacheKey::Products(api_query.clone());
        let cacheable = query.filters.search.is_empty();

        if cacheable && let Some(CacheValue::Products(page)) = self.cached(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let response: ProductsResponse = self.get_json(&format!("/api/products?{api_query}")).await?;
        let page = ProductPage {
            products: response.products,
            pagination: Pagination::from_counts(
                response.pagination.page,
                response.pagination.limit,
                response.pagination.total,
            ),
        };

        if cacheable {
            self.remember(cache_key, CacheValue::Products(page.clone())).await;
        }

        Ok(page)
    }

    /// Get a product with its detail fields.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown id, or another error if
    /// the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(&self, product_id: &ProductId) -> Result<ProductDetail, ApiError> {
        let cache_key = CacheKey::Product(product_id.clone());

        if let Some(CacheValue::Product(product)) = self.cached(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("/api/products/{}", urlencoding::encode(product_id.as_str()));
        let product: ProductDetail = self.get_json(&path).await.map_err(|e| match e {
            ApiError::NotFound(_) => ApiError::NotFound(format!("Product not found: {product_id}")),
            other => other,
        })?;

        self.remember(cache_key, CacheValue::Product(Box::new(product.clone()))).await;

        Ok(product)
    }

    /// Get the category tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_categories(&self) -> Result<Categories, ApiError> {
        if let Some(CacheValue::Categories(categories)) = self.cached(&CacheKey::Categories).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Categories = self.get_json("/api/categories").await?;
        self.remember(CacheKey::Categories, CacheValue::Categories(categories.clone()))
            .await;

        Ok(categories)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pocket_mall_core::{ListFilters, SortOrder};

    use super::*;
    use crate::testing::{FakeApi, FakeCatalog};

    fn query(filters: ListFilters, page: u32) -> ListQuery {
        let mut query = ListQuery::first_page(filters);
        query.page = page;
        query
    }

    #[tokio::test]
    async fn test_get_products_recomputes_pagination() {
        let fake = FakeApi::spawn(FakeCatalog::generate(45)).await;
        let api = ProductApi::new(fake.url(), None);

        let page = api.get_products(&query(ListFilters::default(), 3)).await.unwrap();

        assert_eq!(page.products.len(), 5);
        assert_eq!(page.pagination.page(), 3);
        assert_eq!(page.pagination.total(), 45);
        assert!(!page.pagination.has_next());
        assert!(page.pagination.has_prev());
    }

    #[tokio::test]
    async fn test_get_products_passes_filters() {
        let fake = FakeApi::spawn(FakeCatalog::generate(40)).await;
        let api = ProductApi::new(fake.url(), None);

        let mut filters = ListFilters {
            sort: SortOrder::PriceDesc,
            ..ListFilters::default()
        };
        filters.select_category1("디지털/가전");
        let page = api.get_products(&query(filters, 1)).await.unwrap();

        assert!(!page.products.is_empty());
        assert!(page.products.iter().all(|p| p.category1 == "디지털/가전"));
        assert!(
            page.products
                .windows(2)
                .all(|w| w[0].lprice >= w[1].lprice)
        );
    }

    #[tokio::test]
    async fn test_cache_serves_repeated_requests() {
        let fake = FakeApi::spawn(FakeCatalog::generate(10)).await;
        let api = ProductApi::new(fake.url(), Some(Duration::from_secs(60)));
        let first_page = query(ListFilters::default(), 1);

        api.get_products(&first_page).await.unwrap();
        api.get_products(&first_page).await.unwrap();
        api.get_categories().await.unwrap();
        api.get_categories().await.unwrap();

        assert_eq!(fake.list_requests(), 1);
        assert_eq!(fake.category_requests(), 1);
    }

    #[tokio::test]
    async fn test_search_results_are_not_cached() {
        let fake = FakeApi::spawn(FakeCatalog::generate(10)).await;
        let api = ProductApi::new(fake.url(), Some(Duration::from_secs(60)));

        let mut filters = ListFilters::default();
        filters.set_search("상품 1");
        let search = query(filters, 1);

        api.get_products(&search).await.unwrap();
        api.get_products(&search).await.unwrap();

        assert_eq!(fake.list_requests(), 2);
    }

    #[tokio::test]
    async fn test_get_product() {
        let fake = FakeApi::spawn(FakeCatalog::generate(3)).await;
        let api = ProductApi::new(fake.url(), None);

        let product = api.get_product(&ProductId::from("2")).await.unwrap();
        assert_eq!(product.product.product_id.as_str(), "2");
        assert!(product.stock > 0);

        let missing = api.get_product(&ProductId::from("999")).await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_status() {
        let fake = FakeApi::spawn(FakeCatalog::generate(3)).await;
        fake.set_failing(true);
        let api = ProductApi::new(fake.url(), None);

        let result = api.get_products(&ListQuery::default()).await;
        assert!(matches!(
            result,
            Err(ApiError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                ..
            })
        ));
    }
}
