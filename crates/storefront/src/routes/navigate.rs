//! Page navigation.
//!
//! Every GET that no other route claims is a page request. A full load gets
//! the whole document; a client-side navigation from `shop.js` gets only the
//! `#root` HTML. Either way the session history follows the browser's.

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode, Uri, header::VARY},
    response::{Html, IntoResponse, Response},
};
use pocket_mall_core::ProductId;
use tracing::instrument;

use crate::error::add_breadcrumb;
use crate::pages::{DocumentTemplate, Page, detail, list};
use crate::router::{NAVIGATION_HEADER, Navigation};
use crate::state::AppState;

/// Render the page at the request URI.
///
/// A full load of an unknown URL or product answers 404. A client-side
/// navigation always answers 200 so the not-found page is swapped in.
#[instrument(skip(app, uri, navigation), fields(uri = %uri, navigation = ?navigation))]
pub async fn navigate(State(app): State<AppState>, navigation: Navigation, uri: Uri) -> Response {
    let target = uri.path_and_query().map_or("/", |pq| pq.as_str());
    let resolved = app.router().resolve(target);
    let url = if resolved.query.is_empty() {
        resolved.path.clone()
    } else {
        format!("{}?{}", resolved.path, resolved.query)
    };

    {
        let mut session = app.session().lock().await;
        let history = session.history_mut();
        match navigation {
            Navigation::FullLoad => history.reset(url.clone()),
            Navigation::Push => history.push(url.clone()),
            Navigation::Pop => history.pop_to(&url),
        }
    }
    add_breadcrumb("navigation", "Navigated", Some(&[("url", url.as_str())]));

    let found = match resolved.page {
        Page::List => {
            list::enter(&app, &resolved.query).await;
            true
        }
        Page::Detail => match resolved.params.get("id") {
            Some(id) => detail::enter(&app, &ProductId::from(id)).await == detail::DetailOutcome::Found,
            None => false,
        },
        Page::NotFound => {
            let mut session = app.session().lock().await;
            session.bump_generation();
            session.mount(Page::NotFound, app.render_context());
            false
        }
    };

    let root = app.session().lock().await.take_root();

    let mut response = if navigation.is_client_side() {
        Html(root).into_response()
    } else {
        let ctx = app.render_context();
        let mut response = DocumentTemplate {
            base_path: ctx.base_path().to_string(),
            scroll_threshold: ctx.scroll_threshold(),
            root,
        }
        .into_response();
        if !found && response.status().is_success() {
            *response.status_mut() = StatusCode::NOT_FOUND;
        }
        response
    };

    response
        .headers_mut()
        .insert(VARY, HeaderValue::from_static(NAVIGATION_HEADER));
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use super::*;
    use crate::routes::app;
    use crate::testing::{FakeApi, FakeCatalog, body_string, test_state};

    fn get(uri: &str, navigation: Option<&str>) -> Request<Body> {
        let mut builder = Request::get(uri);
        if let Some(navigation) = navigation {
            builder = builder.header(NAVIGATION_HEADER, navigation);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_full_load_renders_document() {
        let fake = FakeApi::spawn(FakeCatalog::generate(30)).await;
        let response = app(test_state(&fake)).oneshot(get("/", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains(r#"<div id="root""#));
        assert!(html.contains("테스트 상품 001"));
    }

    #[tokio::test]
    async fn test_client_side_navigation_renders_root_only() {
        let fake = FakeApi::spawn(FakeCatalog::generate(30)).await;
        let state = test_state(&fake);
        let app = app(state.clone());

        app.clone().oneshot(get("/", None)).await.unwrap();
        let response = app.oneshot(get("/product/2", Some("push"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[VARY], NAVIGATION_HEADER);
        let html = body_string(response).await;
        assert!(!html.contains("<!DOCTYPE html>"));
        assert!(html.contains("테스트 상품 002"));

        let session = state.session().lock().await;
        assert_eq!(session.history().current(), "/product/2");
        assert!(session.history().can_go_back());
    }

    #[tokio::test]
    async fn test_pop_returns_to_earlier_entry() {
        let fake = FakeApi::spawn(FakeCatalog::generate(30)).await;
        let state = test_state(&fake);
        let app = app(state.clone());

        app.clone().oneshot(get("/", None)).await.unwrap();
        app.clone().oneshot(get("/product/2", Some("push"))).await.unwrap();
        let response = app.oneshot(get("/", Some("pop"))).await.unwrap();

        assert!(body_string(response).await.contains("테스트 상품 001"));
        let session = state.session().lock().await;
        assert_eq!(session.history().current(), "/");
        assert!(!session.history().can_go_back());
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_path_is_404_on_full_load_only() {
        let fake = FakeApi::spawn(FakeCatalog::generate(3)).await;
        let app = app(test_state(&fake));

        let response = app.clone().oneshot(get("/nope", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_string(response).await.contains("페이지를 찾을 수 없습니다"));

        let response = app.clone().oneshot(get("/product/999", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.oneshot(get("/nope", Some("push"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_not_found_discards_list_load_in_flight() {
        let fake = FakeApi::spawn(FakeCatalog::generate(30).with_latency(Duration::from_millis(200))).await;
        let state = test_state(&fake);
        let app = app(state.clone());

        let (_, response) = tokio::join!(list::enter(&state, ""), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            app.oneshot(get("/nope", Some("push"))).await.unwrap()
        });
        assert!(body_string(response).await.contains("페이지를 찾을 수 없습니다"));

        let session = state.session().lock().await;
        assert_eq!(session.mounted_page(), Some(Page::NotFound));
        assert!(!session.scroll().has_more());
        assert!(session.state().products.is_empty());
    }
}
