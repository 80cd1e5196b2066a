//! Product list interactions: filter controls and infinite scroll.

use axum::{
    Form,
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use pocket_mall_core::{ListFilters, SortOrder};
use serde::Deserialize;
use tracing::instrument;

use super::{SHOP_URL_HEADER, root_response};
use crate::error::{AppError, Result};
use crate::pages::list::{self, FilterChange};
use crate::scroll::ScrollMetrics;
use crate::state::AppState;

/// Filter control submission. Each control posts its own field; the first
/// present field in declaration order wins.
#[derive(Debug, Default, Deserialize)]
pub struct FilterForm {
    /// Any value: the breadcrumb "전체" button.
    pub reset: Option<String>,
    pub category2: Option<String>,
    pub category1: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
}

impl FilterForm {
    /// Interpret the submission.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` for an unknown sort order, a page size outside
    /// the offered options, or an empty submission.
    pub fn into_change(self) -> Result<FilterChange> {
        if self.reset.is_some() {
            return Ok(FilterChange::ResetCategories);
        }
        if let Some(category2) = self.category2 {
            return Ok(FilterChange::Category2(category2));
        }
        if let Some(category1) = self.category1 {
            return Ok(FilterChange::Category1(category1));
        }
        if let Some(sort) = self.sort {
            return sort
                .parse::<SortOrder>()
                .map(FilterChange::Sort)
                .map_err(|e| AppError::BadRequest(e.to_string()));
        }
        if let Some(limit) = self.limit {
            return match limit.trim().parse::<u32>() {
                Ok(limit) if ListFilters::is_valid_limit(limit) => Ok(FilterChange::Limit(limit)),
                _ => Err(AppError::BadRequest(format!("Invalid page size: {limit}"))),
            };
        }
        if let Some(search) = self.search {
            return Ok(FilterChange::Search(search));
        }
        Err(AppError::BadRequest("No filter given".to_string()))
    }
}

/// Apply a filter change and return the reloaded list.
///
/// The new list URL is sent in the `x-shop-url` header for the browser's
/// history.
#[instrument(skip(app))]
pub async fn filters(State(app): State<AppState>, Form(form): Form<FilterForm>) -> Result<Response> {
    let change = form.into_change()?;
    let url = list::change_filters(&app, change).await;

    let mut response = root_response(&mut *app.session().lock().await);
    if let Some(url) = url
        && let Ok(value) = HeaderValue::from_str(&app.router().href(&url))
    {
        response.headers_mut().insert(SHOP_URL_HEADER, value);
    }
    Ok(response)
}

/// Scroll position report. Answers 204 unless a page was appended.
#[instrument(skip(app, metrics))]
pub async fn scroll(State(app): State<AppState>, Form(metrics): Form<ScrollMetrics>) -> Response {
    if !list::load_more(&app, metrics).await {
        return StatusCode::NO_CONTENT.into_response();
    }
    root_response(&mut *app.session().lock().await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, header::CONTENT_TYPE},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::pages::list::{FILTERS_KEY, SavedFilters};
    use crate::routes::app;
    use crate::testing::{FakeApi, FakeCatalog, body_string, test_state};

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_filter_form_precedence_and_validation() {
        let form = FilterForm {
            category1: Some("생활/건강".to_string()),
            search: Some("x".to_string()),
            ..FilterForm::default()
        };
        assert_eq!(
            form.into_change().unwrap(),
            FilterChange::Category1("생활/건강".to_string())
        );

        let bad_limit = FilterForm {
            limit: Some("7".to_string()),
            ..FilterForm::default()
        };
        assert!(matches!(bad_limit.into_change(), Err(AppError::BadRequest(_))));

        let bad_sort = FilterForm {
            sort: Some("random".to_string()),
            ..FilterForm::default()
        };
        assert!(matches!(bad_sort.into_change(), Err(AppError::BadRequest(_))));

        assert!(FilterForm::default().into_change().is_err());
    }

    #[tokio::test]
    async fn test_filter_change_sets_url_header() {
        let fake = FakeApi::spawn(FakeCatalog::generate(30)).await;
        let state = test_state(&fake);
        let app = app(state.clone());
        app.clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let response = app.oneshot(post("/filters", "sort=price_desc")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[SHOP_URL_HEADER], "/?sort=price_desc");
        assert!(body_string(response).await.contains("테스트 상품 030"));

        let session = state.session().lock().await;
        let saved: SavedFilters = session.storage().get_item(FILTERS_KEY).unwrap().unwrap();
        assert_eq!(saved.sort, "price_desc");
    }

    #[tokio::test]
    async fn test_invalid_limit_is_rejected() {
        let fake = FakeApi::spawn(FakeCatalog::generate(3)).await;
        let response = app(test_state(&fake))
            .oneshot(post("/filters", "limit=3"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_scroll_loads_next_page_then_goes_quiet() {
        let fake = FakeApi::spawn(FakeCatalog::generate(30)).await;
        let app = app(test_state(&fake));
        app.clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let far = "scroll_top=0&viewport_height=800&document_height=5000";
        let response = app.clone().oneshot(post("/scroll", far)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let bottom = "scroll_top=4200&viewport_height=800&document_height=5000";
        let response = app.clone().oneshot(post("/scroll", bottom)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("테스트 상품 030"));

        let response = app.oneshot(post("/scroll", bottom)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(fake.list_requests(), 2);
    }
}
