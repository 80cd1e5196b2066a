//! Path-pattern router and navigation history.
//!
//! Patterns are `/`-separated segments, either literal (`product`) or a
//! named parameter (`:id`). A path matches when it has the same number of
//! segments and every literal segment is equal; parameter values are taken
//! positionally. Routes are tried in registration order and the first match
//! wins; when nothing matches, the router resolves to its not-found page.
//!
//! The storefront may be deployed below a base path (e.g. `/pocket-mall`).
//! The base is stripped before matching and re-applied by [`Router::href`].
//!
//! Client-side navigation is driven by `static/js/shop.js`: clicks on anchors
//! carrying the `data-link` marker and browser back/forward (`popstate`) are
//! turned into fetches tagged with the [`NAVIGATION_HEADER`]. Everything else
//! is a full page load.

use std::borrow::Cow;
use std::str::FromStr;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use thiserror::Error;

/// Request header set by `shop.js` on client-side navigations.
pub const NAVIGATION_HEADER: &str = "x-shop-navigation";

/// Errors building a router.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Route pattern must start with '/': {0:?}")]
    MissingLeadingSlash(String),

    #[error("Route pattern has an unnamed parameter: {0:?}")]
    UnnamedParam(String),

    #[error("Route pattern repeats parameter {param:?}: {pattern:?}")]
    DuplicateParam { pattern: String, param: String },

    #[error("Base path must start with '/' and not end with '/': {0:?}")]
    InvalidBasePath(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A parsed path pattern such as `/product/:id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl FromStr for RoutePattern {
    type Err = RouteError;

    fn from_str(pattern: &str) -> Result<Self, Self::Err> {
        if !pattern.starts_with('/') {
            return Err(RouteError::MissingLeadingSlash(pattern.to_string()));
        }

        let mut segments = Vec::new();
        for part in pattern.split('/') {
            let segment = match part.strip_prefix(':') {
                Some("") => return Err(RouteError::UnnamedParam(pattern.to_string())),
                Some(name) => {
                    if segments
                        .iter()
                        .any(|s| matches!(s, Segment::Param(existing) if existing == name))
                    {
                        return Err(RouteError::DuplicateParam {
                            pattern: pattern.to_string(),
                            param: name.to_string(),
                        });
                    }
                    Segment::Param(name.to_string())
                }
                None => Segment::Literal(part.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }
}

impl RoutePattern {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match `path` (no query string), returning the extracted parameters.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::default();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal != part => return None,
                Segment::Literal(_) => {}
                Segment::Param(name) => {
                    let value = urlencoding::decode(part)
                        .map_or_else(|_| part.to_string(), Cow::into_owned);
                    params.0.push((name.clone(), value));
                }
            }
        }
        Some(params)
    }
}

/// Parameters extracted from a matched path, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A registered route. Immutable once the router is built.
#[derive(Debug, Clone)]
pub struct Route<P> {
    pub pattern: RoutePattern,
    pub page: P,
}

/// Outcome of resolving a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<P> {
    pub page: P,
    pub params: PathParams,
    /// Path with the base stripped.
    pub path: String,
    /// Query string without the `?`, possibly empty.
    pub query: String,
    /// `true` when no route matched and `page` is the not-found page.
    pub not_found: bool,
}

/// Prefix an app-relative path with `base_path`. `/` under a base is the
/// bare base.
#[must_use]
pub fn join_base(base_path: &str, path: &str) -> String {
    if base_path.is_empty() {
        return path.to_string();
    }
    if path == "/" {
        return base_path.to_string();
    }
    if let Some(query) = path.strip_prefix("/?") {
        return format!("{base_path}?{query}");
    }
    format!("{base_path}{path}")
}

/// Normalize a configured base path to `""` or `/a/b` form.
///
/// Accepts a missing leading slash and a trailing slash; `/` alone means the
/// site root.
///
/// # Errors
///
/// Returns an error if the path contains a query, fragment, whitespace or an
/// empty segment.
pub fn normalize_base_path(raw: &str) -> Result<String, RouteError> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }

    let valid = trimmed.split('/').all(|segment| {
        !segment.is_empty()
            && !segment.contains(['?', '#'])
            && !segment.contains(char::is_whitespace)
    });
    if !valid {
        return Err(RouteError::InvalidBasePath(raw.to_string()));
    }

    Ok(format!("/{trimmed}"))
}

/// Maps URL paths to pages.
#[derive(Debug, Clone)]
pub struct Router<P> {
    routes: Vec<Route<P>>,
    not_found: P,
    base_path: String,
}

impl<P: Clone> Router<P> {
    /// Create a router that falls back to `not_found`.
    #[must_use]
    pub const fn new(not_found: P) -> Self {
        Self {
            routes: Vec::new(),
            not_found,
            base_path: String::new(),
        }
    }

    /// Serve below `base_path`. Empty means the site root.
    ///
    /// # Errors
    ///
    /// Returns an error unless the base is empty or starts with `/` and does
    /// not end with `/`.
    pub fn with_base_path(mut self, base_path: &str) -> Result<Self, RouteError> {
        if !base_path.is_empty() && (!base_path.starts_with('/') || base_path.ends_with('/')) {
            return Err(RouteError::InvalidBasePath(base_path.to_string()));
        }
        base_path.clone_into(&mut self.base_path);
        Ok(self)
    }

    /// Register a route.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is malformed.
    pub fn route(mut self, pattern: &str, page: P) -> Result<Self, RouteError> {
        self.routes.push(Route {
            pattern: pattern.parse()?,
            page,
        });
        Ok(self)
    }

    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    #[must_use]
    pub fn routes(&self) -> &[Route<P>] {
        &self.routes
    }

    /// Strip the base path. `None` when `path` lies outside it.
    #[must_use]
    pub fn strip_base<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.base_path.is_empty() {
            return Some(path);
        }
        match path.strip_prefix(self.base_path.as_str()) {
            Some("") => Some("/"),
            Some(rest) if rest.starts_with('/') => Some(rest),
            _ => None,
        }
    }

    /// Prefix an app-relative path (or path and query) with the base path.
    ///
    /// `/` under a base path is the bare base.
    #[must_use]
    pub fn href(&self, path: &str) -> String {
        join_base(&self.base_path, path)
    }

    /// Resolve a request target (`/path?query`) to a page.
    #[must_use]
    pub fn resolve(&self, target: &str) -> Resolved<P> {
        let (raw_path, query) = target.split_once('?').unwrap_or((target, ""));
        let query = query.split('#').next().unwrap_or_default().to_string();

        let Some(path) = self.strip_base(raw_path) else {
            return self.not_found(raw_path, query);
        };

        for route in &self.routes {
            if let Some(params) = route.pattern.matches(path) {
                return Resolved {
                    page: route.page.clone(),
                    params,
                    path: path.to_string(),
                    query,
                    not_found: false,
                };
            }
        }

        self.not_found(path, query)
    }

    fn not_found(&self, path: &str, query: String) -> Resolved<P> {
        Resolved {
            page: self.not_found.clone(),
            params: PathParams::default(),
            path: path.to_string(),
            query,
            not_found: true,
        }
    }
}

/// How a page request reached the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Address bar, reload or unmarked link: render the whole document.
    FullLoad,
    /// A `data-link` click: render the root and add a history entry.
    Push,
    /// Browser back/forward: render the root for an existing history entry.
    Pop,
}

impl Navigation {
    /// Classify from the navigation header value.
    #[must_use]
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("push") => Self::Push,
            Some("pop") => Self::Pop,
            _ => Self::FullLoad,
        }
    }

    #[must_use]
    pub const fn is_client_side(self) -> bool {
        !matches!(self, Self::FullLoad)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Navigation {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_header(
            parts
                .headers
                .get(NAVIGATION_HEADER)
                .and_then(|v| v.to_str().ok()),
        ))
    }
}

/// Server-side mirror of the tab's session history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    entries: Vec<String>,
    index: usize,
}

impl History {
    /// History with a single entry.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            entries: vec![url.into()],
            index: 0,
        }
    }

    /// URL of the current entry.
    #[must_use]
    pub fn current(&self) -> &str {
        self.entries.get(self.index).map_or("/", String::as_str)
    }

    /// Add an entry after the current one, dropping any forward entries.
    pub fn push(&mut self, url: impl Into<String>) {
        self.entries.truncate(self.index + 1);
        self.entries.push(url.into());
        self.index = self.entries.len() - 1;
    }

    /// Overwrite the current entry.
    pub fn replace(&mut self, url: impl Into<String>) {
        let url = url.into();
        match self.entries.get_mut(self.index) {
            Some(entry) => *entry = url,
            None => *self = Self::new(url),
        }
    }

    /// Start over, as a full page load does.
    pub fn reset(&mut self, url: impl Into<String>) {
        *self = Self::new(url);
    }

    /// Step back. Returns the new current URL, `None` at the first entry.
    pub fn back(&mut self) -> Option<&str> {
        self.index = self.index.checked_sub(1)?;
        Some(self.current())
    }

    /// Step forward. Returns the new current URL, `None` at the last entry.
    pub fn forward(&mut self) -> Option<&str> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        Some(self.current())
    }

    /// Follow a `popstate` to `url`.
    ///
    /// Moves to the nearest matching entry, looking backward first. When the
    /// URL is unknown (the server restarted, or the entry was made before this
    /// session) the current entry is replaced.
    pub fn pop_to(&mut self, url: &str) {
        let backward = (0..self.index)
            .rev()
            .find(|&i| self.entries.get(i).is_some_and(|e| e == url));
        let forward = (self.index + 1..self.entries.len())
            .find(|&i| self.entries.get(i).is_some_and(|e| e == url));

        match backward.or(forward) {
            Some(index) => self.index = index,
            None => self.replace(url),
        }
    }

    #[must_use]
    pub fn can_go_back(&self) -> bool {
        self.index > 0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestPage {
        Home,
        Product,
        Review,
        Missing,
    }

    fn router() -> Router<TestPage> {
        Router::new(TestPage::Missing)
            .route("/", TestPage::Home)
            .unwrap()
            .route("/product/:id", TestPage::Product)
            .unwrap()
            .route("/product/:id/reviews/:review", TestPage::Review)
            .unwrap()
    }

    #[test]
    fn test_static_route() {
        let resolved = router().resolve("/");
        assert_eq!(resolved.page, TestPage::Home);
        assert!(resolved.params.is_empty());
        assert!(!resolved.not_found);
    }

    #[test]
    fn test_param_route_extracts_positionally() {
        let resolved = router().resolve("/product/85067212996");
        assert_eq!(resolved.page, TestPage::Product);
        assert_eq!(resolved.params.get("id"), Some("85067212996"));

        let resolved = router().resolve("/product/1/reviews/7");
        assert_eq!(resolved.page, TestPage::Review);
        assert_eq!(resolved.params.get("id"), Some("1"));
        assert_eq!(resolved.params.get("review"), Some("7"));
    }

    #[test]
    fn test_params_are_percent_decoded() {
        let resolved = router().resolve("/product/a%2Fb%20c");
        assert_eq!(resolved.page, TestPage::Product);
        assert_eq!(resolved.params.get("id"), Some("a/b c"));
    }

    #[test]
    fn test_segment_count_must_match() {
        assert!(router().resolve("/product").not_found);
        assert!(router().resolve("/product/1/extra").not_found);
        assert!(router().resolve("/product/1/").not_found);
        assert_eq!(router().resolve("/cart").page, TestPage::Missing);
    }

    #[test]
    fn test_query_is_split_off() {
        let resolved = router().resolve("/?sort=name_asc&limit=10#top");
        assert_eq!(resolved.page, TestPage::Home);
        assert_eq!(resolved.query, "sort=name_asc&limit=10");
    }

    #[test]
    fn test_first_registered_route_wins() {
        let router = Router::new(TestPage::Missing)
            .route("/product/new", TestPage::Home)
            .unwrap()
            .route("/product/:id", TestPage::Product)
            .unwrap();

        assert_eq!(router.resolve("/product/new").page, TestPage::Home);
        assert_eq!(router.resolve("/product/42").page, TestPage::Product);
    }

    #[test]
    fn test_invalid_patterns() {
        assert_eq!(
            "product/:id".parse::<RoutePattern>(),
            Err(RouteError::MissingLeadingSlash("product/:id".to_string()))
        );
        assert!(matches!(
            "/product/:".parse::<RoutePattern>(),
            Err(RouteError::UnnamedParam(_))
        ));
        assert!(matches!(
            "/a/:id/b/:id".parse::<RoutePattern>(),
            Err(RouteError::DuplicateParam { .. })
        ));
    }

    #[test]
    fn test_base_path() {
        let router = router().with_base_path("/pocket-mall").unwrap();

        assert_eq!(router.resolve("/pocket-mall").page, TestPage::Home);
        assert_eq!(router.resolve("/pocket-mall/").page, TestPage::Home);
        assert_eq!(
            router.resolve("/pocket-mall/product/3").params.get("id"),
            Some("3")
        );
        assert!(router.resolve("/product/3").not_found);
        assert!(router.resolve("/pocket-mallx/product/3").not_found);

        assert_eq!(router.href("/"), "/pocket-mall");
        assert_eq!(router.href("/?limit=10"), "/pocket-mall?limit=10");
        assert_eq!(router.href("/product/3"), "/pocket-mall/product/3");

        assert!(router.clone().with_base_path("/trailing/").is_err());
        assert!(router.with_base_path("relative").is_err());
    }

    #[test]
    fn test_navigation_from_header() {
        assert_eq!(Navigation::from_header(None), Navigation::FullLoad);
        assert_eq!(Navigation::from_header(Some("push")), Navigation::Push);
        assert_eq!(Navigation::from_header(Some("pop")), Navigation::Pop);
        assert_eq!(Navigation::from_header(Some("weird")), Navigation::FullLoad);
    }

    #[test]
    fn test_history_push_back_forward() {
        let mut history = History::new("/");
        history.push("/product/1");
        history.push("/product/2");

        assert_eq!(history.back(), Some("/product/1"));
        assert_eq!(history.back(), Some("/"));
        assert_eq!(history.back(), None);
        assert_eq!(history.forward(), Some("/product/1"));

        history.push("/?sort=name_asc");
        assert_eq!(history.forward(), None, "push drops forward entries");
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_history_pop_to() {
        let mut history = History::new("/");
        history.push("/product/1");
        history.push("/product/2");

        history.pop_to("/");
        assert_eq!(history.current(), "/");
        assert!(!history.can_go_back());

        history.pop_to("/product/2");
        assert_eq!(history.current(), "/product/2");

        history.pop_to("/unknown");
        assert_eq!(history.current(), "/unknown");
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_normalize_base_path() {
        assert_eq!(normalize_base_path("").unwrap(), "");
        assert_eq!(normalize_base_path("/").unwrap(), "");
        assert_eq!(normalize_base_path("pocket-mall/").unwrap(), "/pocket-mall");
        assert_eq!(normalize_base_path("/shop/kr").unwrap(), "/shop/kr");
        assert!(normalize_base_path("/shop//kr").is_err());
        assert!(normalize_base_path("/shop?x=1").is_err());
    }
}
