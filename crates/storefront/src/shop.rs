//! The shopper session.
//!
//! One [`ShopSession`] holds everything a browser tab would: the page state
//! store, the cart, the navigation history and the infinite scroll
//! controller. The mounted page subscribes a renderer to the store, so every
//! state change re-renders the `#root` HTML, which handlers then send back.

use std::sync::{Arc, Mutex, PoisonError};

use pocket_mall_core::{Categories, ListFilters, Pagination, Product, ProductDetail, ProductId};

use crate::cart::{CartState, CartStore};
use crate::pages::{self, Page, RenderContext};
use crate::router::History;
use crate::scroll::InfiniteScroll;
use crate::storage::LocalStorage;
use crate::store::{Merge, Store, SubscriptionId};

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Info,
    Error,
}

impl ToastKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Error => "error",
        }
    }
}

/// A one-shot notification, shown with the next render only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            message: message.into(),
        }
    }
}

/// Page state of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct ShopState {
    /// Products of the list page, in display order.
    pub products: Vec<Product>,
    pub pagination: Pagination,
    pub filters: ListFilters,
    pub categories: Categories,
    /// A first page (or a detail product) is being fetched.
    pub loading: bool,
    /// A further list page is being fetched.
    pub loading_more: bool,
    /// Message for a failed fetch.
    pub error: Option<String>,
    pub detail: Option<ProductDetail>,
    pub related: Vec<Product>,
    /// Quantity picked on the detail page.
    pub quantity: u32,
    /// Copy of the cart, refreshed after every cart mutation.
    pub cart: CartState,
    pub toast: Option<Toast>,
    /// Bumped by every page entry and filter change; fetch results tagged
    /// with an older value are dropped.
    pub generation: u64,
}

impl Default for ShopState {
    fn default() -> Self {
        Self {
            products: Vec::new(),
            pagination: Pagination::default(),
            filters: ListFilters::default(),
            categories: Categories::default(),
            loading: false,
            loading_more: false,
            error: None,
            detail: None,
            related: Vec::new(),
            quantity: 1,
            cart: CartState::default(),
            toast: None,
            generation: 0,
        }
    }
}

impl ShopState {
    /// Look a product up among everything currently on screen.
    #[must_use]
    pub fn find_product(&self, product_id: &ProductId) -> Option<&Product> {
        self.products
            .iter()
            .chain(&self.related)
            .chain(self.detail.as_ref().map(|detail| &detail.product))
            .find(|product| &product.product_id == product_id)
    }
}

/// Partial update of [`ShopState`]. `None` leaves a field untouched; the
/// nested options of `error`, `detail` and `toast` allow clearing them.
#[derive(Debug, Default)]
pub struct ShopStatePatch {
    pub products: Option<Vec<Product>>,
    pub pagination: Option<Pagination>,
    pub filters: Option<ListFilters>,
    pub categories: Option<Categories>,
    pub loading: Option<bool>,
    pub loading_more: Option<bool>,
    pub error: Option<Option<String>>,
    pub detail: Option<Option<ProductDetail>>,
    pub related: Option<Vec<Product>>,
    pub quantity: Option<u32>,
    pub cart: Option<CartState>,
    pub toast: Option<Option<Toast>>,
    pub generation: Option<u64>,
}

impl Merge for ShopState {
    type Patch = ShopStatePatch;

    fn merge(&mut self, patch: ShopStatePatch) {
        fn set<T>(field: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *field = value;
            }
        }

        set(&mut self.products, patch.products);
        set(&mut self.pagination, patch.pagination);
        set(&mut self.filters, patch.filters);
        set(&mut self.categories, patch.categories);
        set(&mut self.loading, patch.loading);
        set(&mut self.loading_more, patch.loading_more);
        set(&mut self.error, patch.error);
        set(&mut self.detail, patch.detail);
        set(&mut self.related, patch.related);
        set(&mut self.quantity, patch.quantity);
        set(&mut self.cart, patch.cart);
        set(&mut self.toast, patch.toast);
        set(&mut self.generation, patch.generation);
    }
}

#[derive(Debug, Clone, Copy)]
struct Mounted {
    page: Page,
    subscription: SubscriptionId,
}

/// State of one shopper, shared by all handlers behind a lock.
#[derive(Debug)]
pub struct ShopSession {
    store: Store<ShopState>,
    cart: CartStore,
    history: History,
    scroll: InfiniteScroll,
    storage: LocalStorage,
    root: Arc<Mutex<String>>,
    mounted: Option<Mounted>,
}

impl ShopSession {
    /// Start a session, rehydrating the cart from `storage`.
    #[must_use]
    pub fn new(storage: LocalStorage, scroll_threshold: f64) -> Self {
        let cart = CartStore::load(storage.clone());
        let state = ShopState {
            cart: cart.snapshot(),
            ..ShopState::default()
        };

        Self {
            store: Store::new(state),
            cart,
            history: History::new("/"),
            scroll: InfiniteScroll::new(scroll_threshold),
            storage,
            root: Arc::new(Mutex::new(String::new())),
            mounted: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &ShopState {
        self.store.state()
    }

    /// Merge a patch into the page state and re-render the mounted page.
    pub fn set_state(&mut self, patch: ShopStatePatch) {
        self.store.set_state(patch);
    }

    /// Mutate the page state in place and re-render the mounted page.
    pub fn update<R>(&mut self, mutate: impl FnOnce(&mut ShopState) -> R) -> R {
        self.store.update(mutate)
    }

    /// Swap the page renderer: the previous page's subscription is dropped,
    /// the new page subscribes and renders once immediately.
    pub fn mount(&mut self, page: Page, ctx: RenderContext) {
        if let Some(previous) = self.mounted.take() {
            self.store.unsubscribe(previous.subscription);
            if previous.page == Page::List && page != Page::List {
                self.scroll.disable();
            }
        }

        write_root(&self.root, page, self.store.state(), &ctx);

        let root = Arc::clone(&self.root);
        let subscription = self
            .store
            .subscribe(move |state: &ShopState| write_root(&root, page, state, &ctx));
        self.mounted = Some(Mounted { page, subscription });
        tracing::debug!(?page, "Page mounted");
    }

    #[must_use]
    pub fn mounted_page(&self) -> Option<Page> {
        self.mounted.map(|mounted| mounted.page)
    }

    /// Start a new generation and return it.
    pub fn bump_generation(&mut self) -> u64 {
        let generation = self.state().generation + 1;
        self.set_state(ShopStatePatch {
            generation: Some(generation),
            ..ShopStatePatch::default()
        });
        generation
    }

    #[must_use]
    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }

    /// Run a cart mutation, then copy the new cart into the page state.
    pub fn cart_action<R>(&mut self, action: impl FnOnce(&mut CartStore) -> R) -> R {
        let result = action(&mut self.cart);
        self.set_state(ShopStatePatch {
            cart: Some(self.cart.snapshot()),
            ..ShopStatePatch::default()
        });
        result
    }

    /// Show a toast with the next response.
    pub fn toast(&mut self, toast: Toast) {
        self.set_state(ShopStatePatch {
            toast: Some(Some(toast)),
            ..ShopStatePatch::default()
        });
    }

    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    pub const fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    #[must_use]
    pub const fn scroll(&self) -> &InfiniteScroll {
        &self.scroll
    }

    pub const fn scroll_mut(&mut self) -> &mut InfiniteScroll {
        &mut self.scroll
    }

    #[must_use]
    pub const fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    /// The latest `#root` HTML. A pending toast is consumed.
    pub fn take_root(&mut self) -> String {
        let html = self
            .root
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        if self.state().toast.is_some() {
            self.set_state(ShopStatePatch {
                toast: Some(None),
                ..ShopStatePatch::default()
            });
        }

        html
    }
}

fn write_root(root: &Mutex<String>, page: Page, state: &ShopState, ctx: &RenderContext) {
    match pages::render(page, state, ctx) {
        Ok(html) => *root.lock().unwrap_or_else(PoisonError::into_inner) = html,
        Err(e) => tracing::error!(error = %e, ?page, "Failed to render page"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{sample_product, temp_storage};

    fn session() -> ShopSession {
        ShopSession::new(temp_storage(), 200.0)
    }

    #[test]
    fn test_patch_merges_only_present_fields() {
        let mut state = ShopState::default();
        state.merge(ShopStatePatch {
            loading: Some(true),
            error: Some(Some("boom".to_string())),
            ..ShopStatePatch::default()
        });
        state.merge(ShopStatePatch {
            error: Some(None),
            ..ShopStatePatch::default()
        });

        assert!(state.loading);
        assert_eq!(state.error, None);
        assert_eq!(state.quantity, 1);
    }

    #[test]
    fn test_mount_renders_and_replaces_previous_page() {
        let mut session = session();
        session.mount(Page::NotFound, RenderContext::default());
        assert!(session.take_root().contains("404"));

        session.mount(Page::List, RenderContext::default());
        assert_eq!(session.store.subscriber_count(), 1);
        assert_eq!(session.mounted_page(), Some(Page::List));
    }

    #[test]
    fn test_toast_is_one_shot() {
        let mut session = session();
        session.mount(Page::NotFound, RenderContext::default());

        session.toast(Toast::info("장바구니에서 제거되었습니다"));
        assert!(session.take_root().contains("장바구니에서 제거되었습니다"));
        assert!(!session.take_root().contains("장바구니에서 제거되었습니다"));
    }

    #[test]
    fn test_cart_action_refreshes_snapshot() {
        let mut session = session();
        session.mount(Page::NotFound, RenderContext::default());

        session.cart_action(|cart| cart.add(&sample_product("1", 220), 1));

        assert_eq!(session.state().cart.item_count(), 1);
        assert!(session.take_root().contains(r#"data-cart-count="1""#));
    }

    #[test]
    fn test_find_product_searches_list_related_and_detail() {
        let mut state = ShopState::default();
        state.products.push(sample_product("1", 100));
        state.related.push(sample_product("2", 100));

        assert!(state.find_product(&ProductId::from("1")).is_some());
        assert!(state.find_product(&ProductId::from("2")).is_some());
        assert!(state.find_product(&ProductId::from("3")).is_none());
    }

    #[test]
    fn test_generation_increases() {
        let mut session = session();
        assert_eq!(session.bump_generation(), 1);
        assert_eq!(session.bump_generation(), 2);
    }
}
