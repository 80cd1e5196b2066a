//! Integration tests for the product list: first load, filters and
//! infinite scroll.

use pocket_mall_integration_tests::TestContext;
use pocket_mall_storefront::routes::SHOP_URL_HEADER;
use pocket_mall_storefront::testing::FakeCatalog;
use reqwest::StatusCode;

const BOTTOM: [(&str, &str); 3] = [
    ("scroll_top", "4200"),
    ("viewport_height", "800"),
    ("document_height", "5000"),
];

// =============================================================================
// First Load
// =============================================================================

#[tokio::test]
async fn test_full_load_renders_document_with_first_page() {
    let ctx = TestContext::new(FakeCatalog::generate(45)).await;

    let response = ctx.load("/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = response.text().await.unwrap();
    assert!(html.contains("<!DOCTYPE html>"));
    assert!(html.contains(r#"<div id="root">"#));
    assert!(html.contains("테스트 상품 001"));
    assert!(html.contains("테스트 상품 020"));
    assert!(!html.contains("테스트 상품 021"));
    assert!(html.contains("45개"));
    assert!(html.contains("data-infinite-scroll"));
    assert!(html.contains("생활/건강"));
}

#[tokio::test]
async fn test_url_filters_drive_first_load() {
    let ctx = TestContext::new(FakeCatalog::generate(45)).await;

    let html = ctx
        .load("/?sort=price_desc&limit=10")
        .await
        .text()
        .await
        .unwrap();

    assert!(html.contains("테스트 상품 045"));
    assert!(html.contains("테스트 상품 036"));
    assert!(!html.contains("테스트 상품 035"));
}

// =============================================================================
// Filters
// =============================================================================

#[tokio::test]
async fn test_category_filter_reloads_and_pushes_url() {
    let ctx = TestContext::new(FakeCatalog::generate(45)).await;
    ctx.load("/").await;

    let response = ctx.post("/filters", &[("category1", "디지털/가전")]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let url = response.headers()[SHOP_URL_HEADER].to_str().unwrap().to_string();
    assert!(url.starts_with("/?category1="), "unexpected url {url}");

    let html = response.text().await.unwrap();
    assert!(html.contains("22개"));
    assert!(html.contains("테스트 상품 002"));
    assert!(!html.contains("테스트 상품 001"));
    assert!(html.contains("노트북"));
}

#[tokio::test]
async fn test_search_filter() {
    let ctx = TestContext::new(FakeCatalog::generate(45)).await;
    ctx.load("/").await;

    let html = ctx
        .post("/filters", &[("search", "상품 04")])
        .await
        .text()
        .await
        .unwrap();

    assert!(html.contains("6개"));
    assert!(html.contains("테스트 상품 045"));
    assert!(!html.contains("테스트 상품 039"));
    assert!(!html.contains("data-infinite-scroll"));
}

#[tokio::test]
async fn test_saved_filters_restore_on_plain_load() {
    let ctx = TestContext::new(FakeCatalog::generate(45)).await;
    ctx.load("/").await;
    ctx.post("/filters", &[("limit", "10")]).await;

    let html = ctx.load("/").await.text().await.unwrap();

    assert!(html.contains("테스트 상품 010"));
    assert!(!html.contains("테스트 상품 011"));
}

#[tokio::test]
async fn test_invalid_filter_is_bad_request() {
    let ctx = TestContext::new(FakeCatalog::generate(5)).await;
    ctx.load("/").await;

    let response = ctx.post("/filters", &[("sort", "cheapest")]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Infinite Scroll
// =============================================================================

#[tokio::test]
async fn test_scrolling_appends_pages_until_exhausted() {
    let ctx = TestContext::new(FakeCatalog::generate(45)).await;
    ctx.load("/").await;

    let response = ctx.post("/scroll", &BOTTOM).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = response.text().await.unwrap();
    assert!(html.contains("테스트 상품 001"));
    assert!(html.contains("테스트 상품 040"));

    let html = ctx.post("/scroll", &BOTTOM).await.text().await.unwrap();
    assert!(html.contains("테스트 상품 045"));
    assert!(!html.contains("data-infinite-scroll"));

    let response = ctx.post("/scroll", &BOTTOM).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(ctx.api.list_requests(), 3);
}

#[tokio::test]
async fn test_scroll_far_from_bottom_does_nothing() {
    let ctx = TestContext::new(FakeCatalog::generate(45)).await;
    ctx.load("/").await;

    let response = ctx
        .post(
            "/scroll",
            &[
                ("scroll_top", "0"),
                ("viewport_height", "800"),
                ("document_height", "5000"),
            ],
        )
        .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(ctx.api.list_requests(), 1);
}

#[tokio::test]
async fn test_api_failure_shows_retry() {
    let ctx = TestContext::new(FakeCatalog::generate(5)).await;
    ctx.api.set_failing(true);

    let response = ctx.load("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("상품을 불러오지 못했습니다"));

    ctx.api.set_failing(false);
    let html = ctx.load("/").await.text().await.unwrap();
    assert!(html.contains("테스트 상품 001"));
}
