//! Product detail page with quantity picker and related products.

use askama::Template;
use pocket_mall_core::{ListFilters, ListQuery, Product, ProductDetail, ProductId};
use tracing::{debug, instrument};

use super::{Chrome, Page, ProductView, RenderContext};
use crate::api::ApiError;
use crate::filters;
use crate::shop::{ShopState, ShopStatePatch};
use crate::state::AppState;

/// Page size of the related products query.
pub const RELATED_LIMIT: u32 = 20;

const LOAD_ERROR: &str = "상품 정보를 불러오지 못했습니다";

/// Result of entering the detail page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailOutcome {
    Found,
    /// The product does not exist; the not-found page is mounted instead.
    NotFound,
}

/// Mount the detail page for `product_id` and load the product and its
/// related products.
#[instrument(skip(app), fields(product_id = %product_id))]
pub async fn enter(app: &AppState, product_id: &ProductId) -> DetailOutcome {
    let generation = {
        let mut session = app.session().lock().await;
        let generation = session.bump_generation();
        session.set_state(ShopStatePatch {
            loading: Some(true),
            error: Some(None),
            detail: Some(None),
            related: Some(Vec::new()),
            quantity: Some(1),
            ..ShopStatePatch::default()
        });
        session.mount(Page::Detail, app.render_context());
        generation
    };

    let detail = match app.api().get_product(product_id).await {
        Ok(detail) => detail,
        Err(ApiError::NotFound(_)) => {
            let mut session = app.session().lock().await;
            if session.state().generation == generation {
                session.set_state(ShopStatePatch {
                    loading: Some(false),
                    ..ShopStatePatch::default()
                });
                session.mount(Page::NotFound, app.render_context());
            }
            return DetailOutcome::NotFound;
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load product");
            let mut session = app.session().lock().await;
            if session.state().generation == generation {
                session.set_state(ShopStatePatch {
                    loading: Some(false),
                    error: Some(Some(LOAD_ERROR.to_string())),
                    ..ShopStatePatch::default()
                });
            }
            return DetailOutcome::Found;
        }
    };

    let related = load_related(app, &detail.product).await;

    let mut session = app.session().lock().await;
    if session.state().generation != generation {
        debug!(generation, "Discarding stale product detail");
        return DetailOutcome::Found;
    }
    session.set_state(ShopStatePatch {
        loading: Some(false),
        detail: Some(Some(detail)),
        related: Some(related),
        ..ShopStatePatch::default()
    });
    DetailOutcome::Found
}

/// Products of the same two-level category, without `product` itself.
/// Failures leave the section empty.
async fn load_related(app: &AppState, product: &Product) -> Vec<Product> {
    if product.category1.is_empty() || product.category2.is_empty() {
        return Vec::new();
    }

    let mut filters = ListFilters {
        limit: RELATED_LIMIT,
        ..ListFilters::default()
    };
    filters.select_category1(product.category1.clone());
    filters.select_category2(product.category2.clone());

    match app.api().get_products(&ListQuery::first_page(filters)).await {
        Ok(page) => page
            .products
            .into_iter()
            .filter(|related| related.product_id != product.product_id)
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load related products");
            Vec::new()
        }
    }
}

/// A change to the quantity picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    Increase,
    Decrease,
    Set(u32),
}

/// Apply a quantity change, clamped to `1..=stock`.
///
/// Returns the new quantity, or `None` when no product is shown.
pub async fn set_quantity(app: &AppState, change: QuantityChange) -> Option<u32> {
    let mut session = app.session().lock().await;
    if session.mounted_page() != Some(Page::Detail) {
        return None;
    }

    session.update(|state| -> Option<u32> {
        let detail = state.detail.as_ref()?;
        let requested = match change {
            QuantityChange::Increase => state.quantity.saturating_add(1),
            QuantityChange::Decrease => state.quantity.saturating_sub(1),
            QuantityChange::Set(quantity) => quantity,
        };
        state.quantity = detail.clamp_quantity(requested);
        Some(state.quantity)
    })
}

// =============================================================================
// Template
// =============================================================================

/// Category breadcrumb entry linking to the filtered list.
pub struct CategoryLink {
    pub name: String,
    pub href: String,
}

/// Product fields shown on the detail page.
pub struct DetailView {
    pub id: String,
    pub title: String,
    pub image: String,
    pub price: String,
    pub vendor: String,
    pub rating: u8,
    pub review_count: u32,
    pub stock: u32,
    pub description: String,
    pub category1: Option<CategoryLink>,
    pub category2: Option<CategoryLink>,
    pub max_quantity: u32,
}

impl DetailView {
    fn new(detail: &ProductDetail, ctx: &RenderContext) -> Self {
        let product = &detail.product;

        let mut filters = ListFilters::default();
        let category1 = (!product.category1.is_empty()).then(|| {
            filters.select_category1(product.category1.clone());
            CategoryLink {
                name: product.category1.clone(),
                href: ctx.href(&ListQuery::first_page(filters.clone()).to_url("/")),
            }
        });
        let category2 = (category1.is_some() && !product.category2.is_empty()).then(|| {
            filters.select_category2(product.category2.clone());
            CategoryLink {
                name: product.category2.clone(),
                href: ctx.href(&ListQuery::first_page(filters.clone()).to_url("/")),
            }
        });

        Self {
            id: product.product_id.to_string(),
            title: product.title.clone(),
            image: product.image.clone(),
            price: product.lprice.to_string(),
            vendor: product.vendor().to_string(),
            rating: detail.rating.min(5),
            review_count: detail.review_count,
            stock: detail.stock,
            description: detail.description.clone(),
            category1,
            category2,
            max_quantity: detail.max_quantity(),
        }
    }

    /// Filled stars followed by empty ones.
    #[must_use]
    pub fn stars(&self) -> String {
        let filled = usize::from(self.rating);
        format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
    }
}

/// Product detail page.
#[derive(Template)]
#[template(path = "pages/detail.html")]
pub struct DetailTemplate {
    pub chrome: Chrome,
    pub detail: Option<DetailView>,
    pub related: Vec<ProductView>,
    pub quantity: u32,
    pub loading: bool,
    pub error: Option<String>,
}

impl DetailTemplate {
    #[must_use]
    pub fn new(state: &ShopState, ctx: &RenderContext) -> Self {
        Self {
            chrome: Chrome::new(state, ctx, "상품 상세", true),
            detail: state.detail.as_ref().map(|detail| DetailView::new(detail, ctx)),
            related: state
                .related
                .iter()
                .map(|product| ProductView::new(product, ctx))
                .collect(),
            quantity: state.quantity,
            loading: state.loading,
            error: state.error.clone(),
        }
    }
}
