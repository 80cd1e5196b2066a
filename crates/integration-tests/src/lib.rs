//! Integration tests for Pocket Mall.
//!
//! Each test starts the storefront on an ephemeral port in front of the fake
//! product API from `pocket_mall_storefront::testing`, then drives it over
//! HTTP the way `shop.js` does.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p pocket-mall-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `storefront_list` - Product list, filters and infinite scroll
//! - `storefront_navigation` - Full loads, client-side navigation, base path
//! - `storefront_cart` - Cart actions and persistence across restarts

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::SocketAddr;

use pocket_mall_storefront::config::StorefrontConfig;
use pocket_mall_storefront::router::NAVIGATION_HEADER;
use pocket_mall_storefront::routes;
use pocket_mall_storefront::state::AppState;
use pocket_mall_storefront::testing::{FakeApi, FakeCatalog, test_config};
use reqwest::header::CONTENT_TYPE;
use tokio::task::JoinHandle;

/// A running storefront and the fake API behind it.
pub struct TestContext {
    pub client: reqwest::Client,
    pub api: FakeApi,
    pub state: AppState,
    config: StorefrontConfig,
    addr: SocketAddr,
    server: JoinHandle<()>,
}

impl TestContext {
    /// Start a storefront at the root path over `catalog`.
    pub async fn new(catalog: FakeCatalog) -> Self {
        Self::with_base_path(catalog, "").await
    }

    /// Start a storefront below `base_path` over `catalog`.
    pub async fn with_base_path(catalog: FakeCatalog, base_path: &str) -> Self {
        let api = FakeApi::spawn(catalog).await;
        let mut config = test_config(api.url());
        config.base_path = base_path.to_string();
        Self::start(api, config).await
    }

    async fn start(api: FakeApi, config: StorefrontConfig) -> Self {
        let (state, addr, server) = serve(&config).await;
        Self {
            client: reqwest::Client::new(),
            api,
            state,
            config,
            addr,
            server,
        }
    }

    /// Stop the server and start a fresh one on the same storage directory,
    /// as after a process restart.
    pub async fn restart(&mut self) {
        self.server.abort();
        let (state, addr, server) = serve(&self.config).await;
        self.state = state;
        self.addr = addr;
        self.server = server;
    }

    /// Absolute URL of an app-relative path, including the base path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}{path}", self.addr, self.config.base_path)
    }

    /// Full page load.
    pub async fn load(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    /// Client-side navigation, `mode` being `push` or `pop`.
    pub async fn navigate(&self, path: &str, mode: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header(NAVIGATION_HEADER, mode)
            .header("hx-request", "true")
            .send()
            .await
            .unwrap()
    }

    /// Form POST as sent by an HTMX control.
    pub async fn post(&self, path: &str, fields: &[(&str, &str)]) -> reqwest::Response {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        self.client
            .post(self.url(path))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("hx-request", "true")
            .body(body)
            .send()
            .await
            .unwrap()
    }
}

async fn serve(config: &StorefrontConfig) -> (AppState, SocketAddr, JoinHandle<()>) {
    let state = AppState::new(config.clone()).unwrap();
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let app = routes::app(state.clone());
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (state, addr, server)
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.server.abort();
    }
}
