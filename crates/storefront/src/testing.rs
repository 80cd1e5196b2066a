//! Test helpers: sample products, temporary storage and a fake product API.
//!
//! Compiled for unit tests and, with the `test-support` feature, for the
//! integration tests crate.

#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::indexing_slicing,
    clippy::cast_possible_truncation
)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Json, Router,
    body::to_bytes,
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use pocket_mall_core::{
    Categories, ListQuery, Pagination, Price, Product, ProductDetail, ProductId, SortOrder,
};
use serde_json::json;
use tokio::task::JoinHandle;
use url::Url;
use uuid::Uuid;

use crate::config::StorefrontConfig;
use crate::state::AppState;
use crate::storage::LocalStorage;

const CATEGORY_TREE: [(&str, [&str; 2]); 2] = [
    ("생활/건강", ["생활용품", "주방용품"]),
    ("디지털/가전", ["노트북", "태블릿PC"]),
];

/// A fresh directory under the system temp dir.
#[must_use]
pub fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("pocket-mall-test-{}", Uuid::new_v4()))
}

/// Local storage in a fresh temporary directory.
#[must_use]
pub fn temp_storage() -> LocalStorage {
    LocalStorage::open(temp_dir()).unwrap()
}

/// A product priced at `won`, without categories.
#[must_use]
pub fn sample_product(id: &str, won: u64) -> Product {
    Product {
        product_id: ProductId::from(id),
        title: format!("상품 {id}"),
        link: format!("https://example.com/products/{id}"),
        image: format!("https://example.com/images/{id}.jpg"),
        lprice: Price::won(won),
        hprice: None,
        mall_name: "테스트몰".to_string(),
        product_type: "1".to_string(),
        brand: "테스트".to_string(),
        maker: String::new(),
        category1: String::new(),
        category2: String::new(),
        category3: String::new(),
        category4: String::new(),
    }
}

/// A product with detail fields: stock 10, rating 4, categorized.
#[must_use]
pub fn sample_detail(id: &str, won: u64) -> ProductDetail {
    let mut product = sample_product(id, won);
    product.category1 = "생활/건강".to_string();
    product.category2 = "생활용품".to_string();

    ProductDetail {
        product,
        description: format!("상품 {id}의 상세 설명입니다."),
        rating: 4,
        review_count: 12,
        stock: 10,
        images: Vec::new(),
    }
}

// =============================================================================
// Fake product API
// =============================================================================

/// Products served by [`FakeApi`].
#[derive(Debug, Clone, Default)]
pub struct FakeCatalog {
    products: Vec<ProductDetail>,
    latency: Option<Duration>,
}

impl FakeCatalog {
    /// `count` products with ids `1..=count`, titled `테스트 상품 001` and
    /// so on, priced at `100 * id` won. Odd ids are 생활/건강, even ids
    /// 디지털/가전; the second-level category alternates every two ids.
    #[must_use]
    pub fn generate(count: usize) -> Self {
        let products = (1..=count)
            .map(|i| {
                let (category1, children) = CATEGORY_TREE[(i + 1) % 2];
                let category2 = children[(i / 2) % 2];
                let id = i.to_string();

                let mut detail = sample_detail(&id, 100 * i as u64);
                detail.product.title = format!("테스트 상품 {i:03}");
                detail.product.category1 = category1.to_string();
                detail.product.category2 = category2.to_string();
                detail
            })
            .collect();

        Self {
            products,
            latency: None,
        }
    }

    /// Delay every response by `latency`.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    #[must_use]
    pub fn products(&self) -> &[ProductDetail] {
        &self.products
    }

    fn categories() -> Categories {
        CATEGORY_TREE
            .iter()
            .map(|(top, children)| {
                (
                    (*top).to_string(),
                    children.iter().map(|child| (*child).to_string()).collect::<Vec<_>>(),
                )
            })
            .collect()
    }

    fn list(&self, query: &ListQuery) -> serde_json::Value {
        let filters = &query.filters;
        let mut matches: Vec<&Product> = self
            .products
            .iter()
            .map(|detail| &detail.product)
            .filter(|p| filters.search.is_empty() || p.title.contains(filters.search.as_str()))
            .filter(|p| filters.category1.as_ref().is_none_or(|c| &p.category1 == c))
            .filter(|p| filters.category2.as_ref().is_none_or(|c| &p.category2 == c))
            .collect();

        match filters.sort {
            SortOrder::PriceAsc => matches.sort_by(|a, b| a.lprice.cmp(&b.lprice)),
            SortOrder::PriceDesc => matches.sort_by(|a, b| b.lprice.cmp(&a.lprice)),
            SortOrder::NameAsc => matches.sort_by(|a, b| a.title.cmp(&b.title)),
            SortOrder::NameDesc => matches.sort_by(|a, b| b.title.cmp(&a.title)),
        }

        let pagination = Pagination::from_counts(query.page, filters.limit, matches.len() as u64);
        let start = (pagination.page() as usize - 1) * pagination.limit() as usize;
        let products: Vec<&Product> = matches
            .into_iter()
            .skip(start)
            .take(pagination.limit() as usize)
            .collect();

        json!({
            "products": products,
            "pagination": {
                "page": pagination.page(),
                "limit": pagination.limit(),
                "total": pagination.total(),
                "totalPages": pagination.total_pages(),
                "hasNext": pagination.has_next(),
                "hasPrev": pagination.has_prev(),
            },
            "filters": {
                "search": filters.search,
                "category1": filters.category1.clone().unwrap_or_default(),
                "category2": filters.category2.clone().unwrap_or_default(),
                "sort": filters.sort.as_str(),
            },
        })
    }
}

#[derive(Default)]
struct Counters {
    list: AtomicUsize,
    detail: AtomicUsize,
    categories: AtomicUsize,
    failing: AtomicBool,
}

struct FakeState {
    catalog: FakeCatalog,
    counters: Arc<Counters>,
}

impl FakeState {
    async fn respond(&self, counter: &AtomicUsize) -> Option<Response> {
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.catalog.latency {
            tokio::time::sleep(latency).await;
        }
        self.counters
            .failing
            .load(Ordering::SeqCst)
            .then(|| (StatusCode::INTERNAL_SERVER_ERROR, "fake failure").into_response())
    }
}

/// The product API on an ephemeral local port, serving a [`FakeCatalog`].
///
/// The server stops when the value is dropped.
pub struct FakeApi {
    url: Url,
    counters: Arc<Counters>,
    handle: JoinHandle<()>,
}

impl FakeApi {
    /// Start serving `catalog`.
    pub async fn spawn(catalog: FakeCatalog) -> Self {
        let counters = Arc::new(Counters::default());
        let state = Arc::new(FakeState {
            catalog,
            counters: Arc::clone(&counters),
        });

        let router = Router::new()
            .route("/api/products", get(list_products))
            .route("/api/products/{id}", get(get_product))
            .route("/api/categories", get(get_categories))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            url: Url::parse(&format!("http://{addr}")).unwrap(),
            counters,
            handle,
        }
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Answer every request with 500 while `failing` is set.
    pub fn set_failing(&self, failing: bool) {
        self.counters.failing.store(failing, Ordering::SeqCst);
    }

    #[must_use]
    pub fn list_requests(&self) -> usize {
        self.counters.list.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn detail_requests(&self) -> usize {
        self.counters.detail.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn category_requests(&self) -> usize {
        self.counters.categories.load(Ordering::SeqCst)
    }
}

impl Drop for FakeApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn list_products(State(state): State<Arc<FakeState>>, RawQuery(query): RawQuery) -> Response {
    if let Some(failure) = state.respond(&state.counters.list).await {
        return failure;
    }
    let query = ListQuery::parse(query.as_deref().unwrap_or_default());
    Json(state.catalog.list(&query)).into_response()
}

async fn get_product(State(state): State<Arc<FakeState>>, Path(id): Path<String>) -> Response {
    if let Some(failure) = state.respond(&state.counters.detail).await {
        return failure;
    }
    state
        .catalog
        .products
        .iter()
        .find(|detail| detail.product.product_id.as_str() == id)
        .map_or_else(
            || (StatusCode::NOT_FOUND, Json(json!({ "error": "Product not found" }))).into_response(),
            |detail| Json(detail).into_response(),
        )
}

async fn get_categories(State(state): State<Arc<FakeState>>) -> Response {
    if let Some(failure) = state.respond(&state.counters.categories).await {
        return failure;
    }
    Json(FakeCatalog::categories()).into_response()
}

// =============================================================================
// Application
// =============================================================================

/// Configuration pointing at `api_url`: no cache, no base path, fresh storage.
#[must_use]
pub fn test_config(api_url: &Url) -> StorefrontConfig {
    StorefrontConfig {
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_path: String::new(),
        product_api_url: api_url.clone(),
        storage_dir: temp_dir(),
        scroll_threshold: 200.0,
        api_cache_ttl: None,
        log_json: false,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Application state backed by `fake`.
#[must_use]
pub fn test_state(fake: &FakeApi) -> AppState {
    AppState::new(test_config(fake.url())).unwrap()
}

/// Collect a response body as text.
pub async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
