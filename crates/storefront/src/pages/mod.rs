//! Page renderers.
//!
//! Each page is a function from [`ShopState`] to the HTML of the `#root`
//! container. Every page shares the header (title, back button, cart badge),
//! the cart modal, the toast and the footer; the page templates include them
//! as partials.

pub mod detail;
pub mod list;

use askama::Template;
use askama_web::WebTemplate;
use pocket_mall_core::Product;

use crate::cart::{CartItem, CartState};
use crate::filters;
use crate::router::join_base;
use crate::shop::{ShopState, Toast};

/// Pages the router can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    /// `/`
    List,
    /// `/product/:id`
    Detail,
    /// Anything else.
    NotFound,
}

/// Values every render needs besides the state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    base_path: String,
    scroll_threshold: f64,
}

impl RenderContext {
    #[must_use]
    pub fn new(base_path: impl Into<String>, scroll_threshold: f64) -> Self {
        Self {
            base_path: base_path.into(),
            scroll_threshold,
        }
    }

    /// App-relative path with the base path applied.
    #[must_use]
    pub fn href(&self, path: &str) -> String {
        join_base(&self.base_path, path)
    }

    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    #[must_use]
    pub const fn scroll_threshold(&self) -> f64 {
        self.scroll_threshold
    }
}

/// Render `page` for `state`.
///
/// # Errors
///
/// Returns an error if a template fails to render.
pub fn render(page: Page, state: &ShopState, ctx: &RenderContext) -> askama::Result<String> {
    match page {
        Page::List => list::ListTemplate::new(state, ctx).render(),
        Page::Detail => detail::DetailTemplate::new(state, ctx).render(),
        Page::NotFound => NotFoundTemplate::new(state, ctx).render(),
    }
}

// =============================================================================
// Shared views
// =============================================================================

/// Header bar.
#[derive(Clone)]
pub struct HeaderView {
    pub title: &'static str,
    /// Show a back button instead of the shop title link.
    pub back: bool,
    pub cart_count: usize,
}

/// Product card for lists and related products.
#[derive(Clone)]
pub struct ProductView {
    pub id: String,
    pub title: String,
    pub image: String,
    pub vendor: String,
    pub price: String,
    pub href: String,
}

impl ProductView {
    #[must_use]
    pub fn new(product: &Product, ctx: &RenderContext) -> Self {
        Self {
            id: product.product_id.to_string(),
            title: product.title.clone(),
            image: product.image.clone(),
            vendor: product.vendor().to_string(),
            price: product.lprice.to_string(),
            href: product_href(ctx, product.product_id.as_str()),
        }
    }
}

/// Link to a product's detail page, with the id percent-encoded.
fn product_href(ctx: &RenderContext, product_id: &str) -> String {
    ctx.href(&format!("/product/{}", urlencoding::encode(product_id)))
}

/// One line of the cart modal.
#[derive(Clone)]
pub struct CartItemView {
    pub id: String,
    pub title: String,
    pub image: String,
    pub unit_price: String,
    pub line_price: String,
    pub quantity: u32,
    pub selected: bool,
    pub href: String,
}

impl CartItemView {
    fn new(item: &CartItem, ctx: &RenderContext) -> Self {
        Self {
            id: item.product_id.to_string(),
            title: item.title.clone(),
            image: item.image.clone(),
            unit_price: item.lprice.to_string(),
            line_price: item.line_total().to_string(),
            quantity: item.quantity,
            selected: item.selected,
            href: product_href(ctx, item.product_id.as_str()),
        }
    }
}

/// Cart modal and badge.
#[derive(Clone)]
pub struct CartView {
    pub open: bool,
    pub items: Vec<CartItemView>,
    pub count: usize,
    pub total_price: String,
    pub selected_count: usize,
    pub selected_price: String,
    pub all_selected: bool,
}

impl CartView {
    #[must_use]
    pub fn new(cart: &CartState, ctx: &RenderContext) -> Self {
        Self {
            open: cart.open,
            items: cart.items.iter().map(|item| CartItemView::new(item, ctx)).collect(),
            count: cart.item_count(),
            total_price: cart.total_price().to_string(),
            selected_count: cart.selected_count(),
            selected_price: cart.selected_price().to_string(),
            all_selected: cart.is_all_selected(),
        }
    }
}

/// Toast notification.
#[derive(Clone)]
pub struct ToastView {
    pub kind: &'static str,
    pub message: String,
}

impl ToastView {
    fn new(toast: &Toast) -> Self {
        Self {
            kind: toast.kind.as_str(),
            message: toast.message.clone(),
        }
    }
}

/// Parts shared by every page template.
#[derive(Clone)]
pub struct Chrome {
    pub ctx: RenderContext,
    pub header: HeaderView,
    pub cart: CartView,
    pub toast: Option<ToastView>,
}

impl Chrome {
    #[must_use]
    pub fn new(state: &ShopState, ctx: &RenderContext, title: &'static str, back: bool) -> Self {
        Self {
            ctx: ctx.clone(),
            header: HeaderView {
                title,
                back,
                cart_count: state.cart.item_count(),
            },
            cart: CartView::new(&state.cart, ctx),
            toast: state.toast.as_ref().map(ToastView::new),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Not-found page.
#[derive(Template)]
#[template(path = "pages/not_found.html")]
pub struct NotFoundTemplate {
    pub chrome: Chrome,
}

impl NotFoundTemplate {
    #[must_use]
    pub fn new(state: &ShopState, ctx: &RenderContext) -> Self {
        Self {
            chrome: Chrome::new(state, ctx, "쇼핑몰", false),
        }
    }
}

/// Full HTML document wrapping a rendered root, for full page loads.
#[derive(Template, WebTemplate)]
#[template(path = "base.html")]
pub struct DocumentTemplate {
    pub base_path: String,
    pub scroll_threshold: f64,
    pub root: String,
}
