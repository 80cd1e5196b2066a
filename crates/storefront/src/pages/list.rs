//! Product list page: filters, category navigation and infinite scroll.

use askama::Template;
use pocket_mall_core::{LIMIT_OPTIONS, ListFilters, ListQuery, SortOrder};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{Chrome, Page, ProductView};
use crate::filters;
use crate::scroll::{LoadOutcome, ScrollMetrics};
use crate::shop::{ShopSession, ShopState, ShopStatePatch};
use crate::state::AppState;
use crate::storage::LocalStorage;

/// Storage key of the remembered list filters.
pub const FILTERS_KEY: &str = "listPageFilters";

const LOAD_ERROR: &str = "상품을 불러오지 못했습니다";

/// Filters remembered between visits. Categories are not remembered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedFilters {
    pub limit: u32,
    pub search: String,
    pub sort: String,
}

impl SavedFilters {
    #[must_use]
    pub fn from_filters(filters: &ListFilters) -> Self {
        Self {
            limit: filters.limit,
            search: filters.search.clone(),
            sort: filters.sort.as_str().to_string(),
        }
    }

    /// Default filters with the remembered values applied. Invalid values
    /// are skipped.
    #[must_use]
    pub fn to_filters(&self) -> ListFilters {
        let mut filters = ListFilters::default();
        if self.limit > 0 {
            filters.limit = self.limit;
        }
        filters.set_search(&self.search);
        if let Ok(sort) = self.sort.parse() {
            filters.sort = sort;
        }
        filters
    }
}

/// Query for entering the list at `query`: the URL wins when it carries any
/// list key, then the remembered filters, then the defaults. Always page 1.
#[must_use]
pub fn initial_query(query: &str, storage: &LocalStorage) -> ListQuery {
    let mut list_query = if ListQuery::has_list_params(query) {
        ListQuery::parse(query)
    } else {
        storage
            .get_or_default::<Option<SavedFilters>>(FILTERS_KEY)
            .map_or_else(ListQuery::default, |saved| {
                ListQuery::first_page(saved.to_filters())
            })
    };
    list_query.page = 1;
    list_query
}

/// One filter control changing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterChange {
    Search(String),
    Sort(SortOrder),
    Limit(u32),
    Category1(String),
    Category2(String),
    /// The breadcrumb's "전체" button.
    ResetCategories,
}

impl FilterChange {
    pub fn apply(&self, filters: &mut ListFilters) {
        match self {
            Self::Search(search) => filters.set_search(search),
            Self::Sort(sort) => filters.sort = *sort,
            Self::Limit(limit) => filters.limit = *limit,
            Self::Category1(category1) => filters.select_category1(category1.clone()),
            Self::Category2(category2) => filters.select_category2(category2.clone()),
            Self::ResetCategories => filters.reset_categories(),
        }
    }
}

/// Mount the list page for the URL query `query` and load its first page.
#[instrument(skip(app))]
pub async fn enter(app: &AppState, query: &str) {
    let (list_query, generation, with_categories) = {
        let mut session = app.session().lock().await;
        let list_query = initial_query(query, session.storage());
        session.mount(Page::List, app.render_context());
        let generation = begin_load(&mut session, &list_query.filters);
        let with_categories = session.state().categories.is_empty();
        (list_query, generation, with_categories)
    };

    load_first_page(app, &list_query, generation, with_categories).await;
}

/// Apply a filter change: remember the filters, go back to page 1, refetch
/// and record the new URL in history.
///
/// Returns the new app-relative URL, or `None` when nothing changed.
#[instrument(skip(app))]
pub async fn change_filters(app: &AppState, change: FilterChange) -> Option<String> {
    let (list_query, generation, url) = {
        let mut session = app.session().lock().await;
        if session.mounted_page() != Some(Page::List) {
            debug!("Ignoring filter change outside the list page");
            return None;
        }

        let mut filters = session.state().filters.clone();
        change.apply(&mut filters);
        if filters == session.state().filters {
            return None;
        }

        if let Err(e) = session
            .storage()
            .set_item(FILTERS_KEY, &SavedFilters::from_filters(&filters))
        {
            tracing::warn!(error = %e, "Failed to remember list filters");
        }

        let list_query = ListQuery::first_page(filters);
        let url = list_query.to_url("/");
        session.history_mut().push(url.clone());
        let generation = begin_load(&mut session, &list_query.filters);
        (list_query, generation, url)
    };

    load_first_page(app, &list_query, generation, false).await;
    Some(url)
}

/// Handle a scroll event: load and append the next page if the controller
/// grants it.
///
/// Returns `true` when the list changed.
#[instrument(skip(app), fields(distance = metrics.distance_to_bottom()))]
pub async fn load_more(app: &AppState, metrics: ScrollMetrics) -> bool {
    let (ticket, list_query) = {
        let mut session = app.session().lock().await;
        if session.mounted_page() != Some(Page::List) {
            return false;
        }
        let Some(ticket) = session.scroll_mut().on_scroll(&metrics) else {
            return false;
        };

        session.set_state(ShopStatePatch {
            loading_more: Some(true),
            ..ShopStatePatch::default()
        });

        let mut list_query = ListQuery::first_page(session.state().filters.clone());
        list_query.page = ticket.page;
        (ticket, list_query)
    };
    debug!(page = ticket.page, generation = ticket.generation, "Loading next page");

    let result = app.api().get_products(&list_query).await;

    let mut session = app.session().lock().await;
    let outcome = match &result {
        Ok(page) => LoadOutcome::Loaded {
            has_more: page.pagination.has_next(),
        },
        Err(_) => LoadOutcome::Failed,
    };
    if !session.scroll_mut().complete(ticket, outcome) {
        debug!(page = ticket.page, "Discarding stale page");
        return false;
    }

    match result {
        Ok(page) => session.update(|state| {
            state.products.extend(page.products);
            state.pagination = page.pagination;
            state.loading_more = false;
        }),
        Err(e) => {
            tracing::error!(error = %e, page = ticket.page, "Failed to load next page");
            session.set_state(ShopStatePatch {
                loading_more: Some(false),
                ..ShopStatePatch::default()
            });
        }
    }
    true
}

/// Start a first-page load of `filters` and return its generation.
fn begin_load(session: &mut ShopSession, filters: &ListFilters) -> u64 {
    let generation = session.bump_generation();
    session.scroll_mut().reset(generation, 1, false);
    session.set_state(ShopStatePatch {
        filters: Some(filters.clone()),
        loading: Some(true),
        loading_more: Some(false),
        error: Some(None),
        ..ShopStatePatch::default()
    });
    generation
}

async fn load_first_page(app: &AppState, list_query: &ListQuery, generation: u64, with_categories: bool) {
    let api = app.api();
    let categories = async {
        if with_categories {
            Some(api.get_categories().await)
        } else {
            None
        }
    };
    let (page, categories) = tokio::join!(api.get_products(list_query), categories);

    let mut session = app.session().lock().await;
    if session.state().generation != generation {
        debug!(generation, "Discarding stale product list");
        return;
    }

    let mut patch = ShopStatePatch {
        loading: Some(false),
        ..ShopStatePatch::default()
    };

    match categories {
        Some(Ok(categories)) => patch.categories = Some(categories),
        Some(Err(e)) => tracing::warn!(error = %e, "Failed to load categories"),
        None => {}
    }

    match page {
        Ok(page) => {
            session
                .scroll_mut()
                .reset(generation, page.pagination.page(), page.pagination.has_next());
            patch.products = Some(page.products);
            patch.pagination = Some(page.pagination);
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load products");
            patch.error = Some(Some(LOAD_ERROR.to_string()));
        }
    }

    session.set_state(patch);
}

// =============================================================================
// Template
// =============================================================================

/// `<option>` of a select.
#[derive(Clone)]
pub struct OptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Category selection button.
#[derive(Clone)]
pub struct CategoryButton {
    pub name: String,
    pub selected: bool,
}

/// Product list page.
#[derive(Template)]
#[template(path = "pages/list.html")]
pub struct ListTemplate {
    pub chrome: Chrome,
    pub search: String,
    pub sort_options: Vec<OptionView>,
    pub limit_options: Vec<OptionView>,
    pub category1: Option<String>,
    pub category2: Option<String>,
    /// Form field the category buttons set: `category1` or `category2`.
    pub category_field: &'static str,
    pub category_buttons: Vec<CategoryButton>,
    pub categories_loading: bool,
    pub products: Vec<ProductView>,
    pub total: u64,
    pub loading: bool,
    pub loading_more: bool,
    pub has_next: bool,
    pub error: Option<String>,
    /// URL of the current list, for the retry link.
    pub retry_href: String,
}

impl ListTemplate {
    #[must_use]
    pub fn new(state: &ShopState, ctx: &super::RenderContext) -> Self {
        let filters = &state.filters;

        let sort_options = SortOrder::ALL
            .iter()
            .map(|sort| OptionView {
                value: sort.as_str().to_string(),
                label: sort.label().to_string(),
                selected: *sort == filters.sort,
            })
            .collect();

        let limit_options = LIMIT_OPTIONS
            .iter()
            .map(|limit| OptionView {
                value: limit.to_string(),
                label: format!("{limit}개"),
                selected: *limit == filters.limit,
            })
            .collect();

        let button = |name: &str, selected: bool| CategoryButton {
            name: name.to_string(),
            selected,
        };
        let (category_field, category_buttons) = match &filters.category1 {
            None => (
                "category1",
                state
                    .categories
                    .top_level()
                    .map(|name| button(name, false))
                    .collect(),
            ),
            Some(category1) => (
                "category2",
                state
                    .categories
                    .children(category1)
                    .map(|name| button(name, filters.category2.as_deref() == Some(name)))
                    .collect(),
            ),
        };

        Self {
            chrome: Chrome::new(state, ctx, "쇼핑몰", false),
            search: filters.search.clone(),
            sort_options,
            limit_options,
            category1: filters.category1.clone(),
            category2: filters.category2.clone(),
            category_field,
            category_buttons,
            categories_loading: state.categories.is_empty() && state.loading,
            products: state
                .products
                .iter()
                .map(|product| ProductView::new(product, ctx))
                .collect(),
            total: state.pagination.total(),
            loading: state.loading,
            loading_more: state.loading_more,
            has_next: state.pagination.has_next(),
            error: state.error.clone(),
            retry_href: ctx.href(&ListQuery::first_page(filters.clone()).to_url("/")),
        }
    }
}
