//! Codec between list state and a URL query string.
//!
//! The same codec produces the address-bar query (defaults omitted, so the
//! landing page stays at a bare `/`) and the product API query (every paging
//! key spelled out).
//!
//! Parsing is lenient: a malformed value falls back to its default instead of
//! failing, and keys the list does not own are carried through untouched.

use url::form_urlencoded;

use crate::types::{DEFAULT_LIMIT, ListFilters, SortOrder};

const LIMIT: &str = "limit";
const SORT: &str = "sort";
const SEARCH: &str = "search";
const CATEGORY1: &str = "category1";
const CATEGORY2: &str = "category2";
const PAGE: &str = "page";
/// Older links spell the page as `current`.
const PAGE_ALIAS: &str = "current";

const LIST_KEYS: [&str; 7] = [LIMIT, SORT, SEARCH, CATEGORY1, CATEGORY2, PAGE, PAGE_ALIAS];

/// List state as carried by a query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub filters: ListFilters,
    /// Page to fetch, starting at 1.
    pub page: u32,
    /// Pairs with keys the list does not own, in their original order.
    extra: Vec<(String, String)>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::first_page(ListFilters::default())
    }
}

impl ListQuery {
    /// Query for the first page of `filters`.
    #[must_use]
    pub const fn first_page(filters: ListFilters) -> Self {
        Self {
            filters,
            page: 1,
            extra: Vec::new(),
        }
    }

    /// The same filters, one page further.
    #[must_use]
    pub fn next_page(&self) -> Self {
        Self {
            filters: self.filters.clone(),
            page: self.page.saturating_add(1),
            extra: self.extra.clone(),
        }
    }

    /// Parse a query string, with or without the leading `?`.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use pocket_mall_core::{ListQuery, SortOrder};
    /// let query = ListQuery::parse("?limit=50&sort=name_desc&search=%EC%A0%A4%EB%A6%AC");
    /// assert_eq!(query.filters.limit, 50);
    /// assert_eq!(query.filters.sort, SortOrder::NameDesc);
    /// assert_eq!(query.filters.search, "젤리");
    /// ```
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let mut filters = ListFilters::default();
        let mut page = 1;
        let mut category2 = None;
        let mut extra = Vec::new();

        for (key, value) in form_urlencoded::parse(trim_question_mark(query).as_bytes()) {
            match key.as_ref() {
                LIMIT => {
                    filters.limit = value
                        .trim()
                        .parse::<u32>()
                        .ok()
                        .filter(|limit| *limit > 0)
                        .unwrap_or(DEFAULT_LIMIT);
                }
                SORT => filters.sort = value.parse::<SortOrder>().unwrap_or_default(),
                SEARCH => filters.set_search(&value),
                CATEGORY1 => filters.select_category1(value.into_owned()),
                CATEGORY2 => category2 = Some(value.into_owned()),
                PAGE | PAGE_ALIAS => {
                    page = value
                        .trim()
                        .parse::<u32>()
                        .ok()
                        .filter(|page| *page > 0)
                        .unwrap_or(1);
                }
                _ => extra.push((key.into_owned(), value.into_owned())),
            }
        }

        // category2 is applied last so that key order does not matter
        if let Some(category2) = category2 {
            filters.select_category2(category2);
        }

        Self {
            filters,
            page,
            extra,
        }
    }

    /// Whether a query string carries any list key at all.
    ///
    /// Used to decide between URL state and saved filters on first load.
    #[must_use]
    pub fn has_list_params(query: &str) -> bool {
        form_urlencoded::parse(trim_question_mark(query).as_bytes())
            .any(|(key, _)| LIST_KEYS.contains(&key.as_ref()))
    }

    /// Serialize for the address bar, omitting values equal to their defaults.
    ///
    /// Returns an empty string when everything is default.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let defaults = ListFilters::default();
        let mut serializer = form_urlencoded::Serializer::new(String::new());

        if !self.filters.search.is_empty() {
            serializer.append_pair(SEARCH, &self.filters.search);
        }
        if let Some(category1) = &self.filters.category1 {
            serializer.append_pair(CATEGORY1, category1);
        }
        if let Some(category2) = &self.filters.category2 {
            serializer.append_pair(CATEGORY2, category2);
        }
        if self.filters.sort != defaults.sort {
            serializer.append_pair(SORT, self.filters.sort.as_str());
        }
        if self.filters.limit != defaults.limit {
            serializer.append_pair(LIMIT, &self.filters.limit.to_string());
        }
        if self.page > 1 {
            serializer.append_pair(PAGE, &self.page.to_string());
        }
        for (key, value) in &self.extra {
            serializer.append_pair(key, value);
        }

        serializer.finish()
    }

    /// Serialize for the product API: paging keys are always present.
    #[must_use]
    pub fn to_api_query(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer
            .append_pair(PAGE, &self.page.to_string())
            .append_pair(LIMIT, &self.filters.limit.to_string())
            .append_pair(SORT, self.filters.sort.as_str());

        if !self.filters.search.is_empty() {
            serializer.append_pair(SEARCH, &self.filters.search);
        }
        if let Some(category1) = &self.filters.category1 {
            serializer.append_pair(CATEGORY1, category1);
        }
        if let Some(category2) = &self.filters.category2 {
            serializer.append_pair(CATEGORY2, category2);
        }

        serializer.finish()
    }

    /// `path` followed by the address-bar query, if any.
    #[must_use]
    pub fn to_url(&self, path: &str) -> String {
        let query = self.to_query_string();
        if query.is_empty() {
            path.to_string()
        } else {
            format!("{path}?{query}")
        }
    }
}

fn trim_question_mark(query: &str) -> &str {
    query.strip_prefix('?').unwrap_or(query)
}
