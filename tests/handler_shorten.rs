mod common;

use axum::{Router, routing::post};
use axum_test::TestServer;
use serde_json::json;
use shortstore::api::handlers::shorten_handler;

fn server(state: shortstore::AppState) -> TestServer {
    let app = Router::new()
        .route("/api/shorten", post(shorten_handler))
        .with_state(state);

    TestServer::new(app).unwrap()
}

#[tokio::test]
async fn test_shorten_success() {
    let pool = common::migrated_pool().await;
    let server = server(common::create_test_state(pool.clone(), common::ready_status()));

    let response = server
        .post("/api/shorten")
        .add_header("Host", "s.example.com")
        .json(&json!({ "url": "https://example.com/long/path" }))
        .await;

    response.assert_status(axum::http::StatusCode::CREATED);

    let json = response.json::<serde_json::Value>();
    let code = json["code"].as_str().unwrap();
    assert_eq!(code.len(), 7);
    assert_eq!(json["original_url"], "https://example.com/long/path");
    assert_eq!(json["short_url"], format!("http://s.example.com/{code}"));
    assert!(json["created_at"].is_string());

    let stored = shortstore::domain::repositories::ShortenedUrlRepository::get_original_url(
        common::repository(&pool).as_ref(),
        code,
    )
    .await
    .unwrap();
    assert_eq!(stored.as_deref(), Some("https://example.com/long/path"));
}

#[tokio::test]
async fn test_shorten_uses_forwarded_proto() {
    let pool = common::migrated_pool().await;
    let server = server(common::create_test_state(pool, common::ready_status()));

    let response = server
        .post("/api/shorten")
        .add_header("Host", "s.example.com:8443")
        .add_header("X-Forwarded-Proto", "https")
        .json(&json!({ "url": "https://example.com" }))
        .await;

    response.assert_status(axum::http::StatusCode::CREATED);

    let json = response.json::<serde_json::Value>();
    let short_url = json["short_url"].as_str().unwrap();
    assert!(short_url.starts_with("https://s.example.com:8443/"));
}

#[tokio::test]
async fn test_shorten_relative_url_rejected() {
    let pool = common::migrated_pool().await;
    let server = server(common::create_test_state(pool, common::ready_status()));

    let response = server
        .post("/api/shorten")
        .add_header("Host", "s.example.com")
        .json(&json!({ "url": "/relative/path" }))
        .await;

    response.assert_status_bad_request();

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["error"]["code"], "validation_error");
    assert_eq!(json["error"]["message"], "Invalid URL format");
}

#[tokio::test]
async fn test_shorten_non_http_scheme_rejected() {
    let pool = common::migrated_pool().await;
    let server = server(common::create_test_state(pool, common::ready_status()));

    let response = server
        .post("/api/shorten")
        .add_header("Host", "s.example.com")
        .json(&json!({ "url": "ftp://example.com/file" }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_shorten_empty_url_fails_validation() {
    let pool = common::migrated_pool().await;
    let server = server(common::create_test_state(pool, common::ready_status()));

    let response = server
        .post("/api/shorten")
        .add_header("Host", "s.example.com")
        .json(&json!({ "url": "" }))
        .await;

    response.assert_status_bad_request();

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["error"]["message"], "Request validation failed");
}

#[tokio::test]
async fn test_shorten_storage_error_is_internal() {
    // Schema never applied, so the table is missing.
    let pool = common::memory_pool().await;
    let server = server(common::create_test_state(pool, common::ready_status()));

    let response = server
        .post("/api/shorten")
        .add_header("Host", "s.example.com")
        .json(&json!({ "url": "https://example.com" }))
        .await;

    response.assert_status(axum::http::StatusCode::INTERNAL_SERVER_ERROR);

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["error"]["code"], "internal_error");
}
