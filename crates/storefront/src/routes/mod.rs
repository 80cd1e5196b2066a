//! HTTP route handlers for the storefront.
//!
//! Every route lives below the configured base path.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Health check
//! GET  /static/*               - Static assets (shop.js)
//!
//! # Pages (fallback, see `navigate`)
//! GET  /                       - Product list
//! GET  /product/{id}           - Product detail
//! GET  anything else           - Not found
//!
//! # List (HTMX, return #root)
//! POST /filters                - Change search, sort, limit or category
//! POST /scroll                 - Scroll position report; 204 when nothing loads
//!
//! # Detail (HTMX, return #root)
//! POST /detail/quantity        - Quantity picker
//!
//! # Cart (HTMX, return #root)
//! POST /cart/add               - Add a product
//! POST /cart/remove            - Remove a product
//! POST /cart/increase          - Quantity + 1
//! POST /cart/decrease          - Quantity - 1, removing at 1
//! POST /cart/quantity          - Set quantity
//! POST /cart/toggle            - Toggle one selection
//! POST /cart/toggle-all        - Toggle or set every selection
//! POST /cart/remove-selected   - Remove selected products
//! POST /cart/clear             - Empty the cart
//! POST /cart/open              - Open the cart modal
//! POST /cart/close             - Close the cart modal
//! POST /cart/checkout          - Checkout placeholder
//! ```

pub mod cart;
pub mod detail;
pub mod list;
pub mod navigate;

use axum::{
    Router,
    http::HeaderValue,
    middleware::from_fn,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{request_id_middleware, security_headers_middleware};
use crate::shop::ShopSession;
use crate::state::AppState;

/// Response header carrying the URL `shop.js` pushes onto the browser
/// history after a filter change.
pub const SHOP_URL_HEADER: &str = "x-shop-url";

/// Directory of the static assets.
pub const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
        .route("/increase", post(cart::increase))
        .route("/decrease", post(cart::decrease))
        .route("/quantity", post(cart::set_quantity))
        .route("/toggle", post(cart::toggle))
        .route("/toggle-all", post(cart::toggle_all))
        .route("/remove-selected", post(cart::remove_selected))
        .route("/clear", post(cart::clear))
        .route("/open", post(cart::open))
        .route("/close", post(cart::close))
        .route("/checkout", post(cart::checkout))
}

/// Create the storefront routes below `base_path`.
pub fn routes(base_path: &str) -> Router<AppState> {
    let at = |path: &str| format!("{base_path}{path}");

    Router::new()
        .route(&at("/health"), get(health))
        .route(&at("/filters"), post(list::filters))
        .route(&at("/scroll"), post(list::scroll))
        .route(&at("/detail/quantity"), post(detail::quantity))
        .nest(&at("/cart"), cart_routes())
        .nest_service(&at("/static"), ServeDir::new(STATIC_DIR))
        .fallback(get(navigate::navigate))
}

/// Build the full application: routes, middleware and state.
pub fn app(state: AppState) -> Router {
    let base_path = state.config().base_path.clone();

    routes(&base_path)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// The re-rendered `#root` of the session.
///
/// With no page mounted (the server restarted under an open tab) the browser
/// is told to reload instead.
pub(crate) fn root_response(session: &mut ShopSession) -> Response {
    if session.mounted_page().is_none() {
        return ([("hx-refresh", HeaderValue::from_static("true"))], Html(String::new()))
            .into_response();
    }
    Html(session.take_root()).into_response()
}
