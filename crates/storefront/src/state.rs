//! Application state shared across handlers.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::api::ProductApi;
use crate::config::StorefrontConfig;
use crate::pages::{Page, RenderContext};
use crate::router::{RouteError, Router};
use crate::shop::ShopSession;
use crate::storage::{LocalStorage, StorageError};

/// Error creating the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("route error: {0}")]
    Route(#[from] RouteError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// product API client, the page router and the shopper session.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: ProductApi,
    router: Router<Page>,
    session: Mutex<ShopSession>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Opens the local storage directory and rehydrates the cart from it.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage directory cannot be created or the
    /// base path is invalid.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let storage = LocalStorage::open(&config.storage_dir)?;
        let api = ProductApi::new(&config.product_api_url, config.api_cache_ttl);
        let router = page_router(&config.base_path)?;
        let session = ShopSession::new(storage, config.scroll_threshold);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                router,
                session: Mutex::new(session),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the product API client.
    #[must_use]
    pub fn api(&self) -> &ProductApi {
        &self.inner.api
    }

    /// Get a reference to the page router.
    #[must_use]
    pub fn router(&self) -> &Router<Page> {
        &self.inner.router
    }

    /// The shopper session. Handlers hold the lock only between awaits on
    /// the product API, never across them.
    #[must_use]
    pub fn session(&self) -> &Mutex<ShopSession> {
        &self.inner.session
    }

    /// Context for rendering pages.
    #[must_use]
    pub fn render_context(&self) -> RenderContext {
        RenderContext::new(&self.inner.config.base_path, self.inner.config.scroll_threshold)
    }
}

/// The storefront's page table.
fn page_router(base_path: &str) -> Result<Router<Page>, RouteError> {
    Router::new(Page::NotFound)
        .with_base_path(base_path)?
        .route("/", Page::List)?
        .route("/product/:id", Page::Detail)
}
