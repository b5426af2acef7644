//! Integration tests for the middleware stack.
//!
//! Verifies HTTP-level behavior of rate limiting and API key auth,
//! including 429/401 responses and bypass rules.
//!
//! This test requires the `sqlite` feature flag.

#![cfg(feature = "sqlite")]

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use campus_gateway::MockGateway;
use campus_hex::{RegistrationService, inbound::HttpServer};
use campus_repo::SqliteRepo;
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Helper to create a test server with a custom rate limit.
async fn create_test_server(requests_per_minute: u32) -> HttpServer<SqliteRepo, MockGateway> {
    // Use in-memory SQLite for tests
    let repo = SqliteRepo::new("sqlite::memory:").await.unwrap();
    let service = RegistrationService::new(repo, MockGateway::new("k1", "secret"));
    HttpServer::with_rate_limit(service, requests_per_minute)
}

fn health_request() -> Request<Body> {
    Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap()
}

fn bootstrap_request() -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/bootstrap")
        .header("Content-Type", "application/json")
        .body(Body::from(r#"{"name": "test-key"}"#))
        .unwrap()
}

/// Helper to make an authenticated API request.
fn api_request(api_key: &str) -> Request<Body> {
    Request::builder()
        .uri("/api/registrations/event/7")
        .header("Authorization", format!("Bearer {}", api_key))
        .body(Body::empty())
        .unwrap()
}

/// Helper to bootstrap and extract the raw API key from the response.
async fn bootstrap_api_key(app: axum::Router) -> String {
    let response = app.oneshot(bootstrap_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    json["api_key"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_rate_limiting_returns_429_when_exceeded() {
    // Only 3 requests allowed per minute. Bootstrap uses the "anonymous"
    // quota, so the authenticated key starts with its full quota of 3.
    let server = create_test_server(3).await;
    let app = server.router();

    let api_key = bootstrap_api_key(app.clone()).await;

    for i in 1..=3 {
        let response = app.clone().oneshot(api_request(&api_key)).await.unwrap();
        assert_ne!(
            response.status(),
            StatusCode::TOO_MANY_REQUESTS,
            "Request {} should not be rate limited (quota not yet exceeded)",
            i
        );
    }

    let response = app.clone().oneshot(api_request(&api_key)).await.unwrap();

    assert_eq!(
        response.status(),
        StatusCode::TOO_MANY_REQUESTS,
        "Request should be rate limited after exceeding quota"
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert!(
        json["error"]
            .as_str()
            .unwrap()
            .contains("Rate limit exceeded")
    );
    assert_eq!(json["retry_after_seconds"], 60);
}

#[tokio::test]
async fn test_rate_limiting_health_endpoint_bypassed() {
    let server = create_test_server(1).await;
    let app = server.router();

    // Health bypasses the limiter entirely.
    for _ in 0..10 {
        let response = app.clone().oneshot(health_request()).await.unwrap();

        assert_eq!(
            response.status(),
            StatusCode::OK,
            "Health endpoint should not be rate limited"
        );
    }
}

#[tokio::test]
async fn test_rate_limiting_per_key_isolation() {
    let server = create_test_server(100).await;
    let app = server.router();

    let key_a = bootstrap_api_key(app.clone()).await;

    // Bootstrap only works once per store, so key B gets its own server.
    let server_b = create_test_server(2).await;
    let app_b = server_b.router();
    let key_b = bootstrap_api_key(app_b.clone()).await;

    let response = app.clone().oneshot(api_request(&key_a)).await.unwrap();
    assert_eq!(
        response.status(),
        StatusCode::OK,
        "Key A request 1 should succeed"
    );

    let response = app_b.clone().oneshot(api_request(&key_b)).await.unwrap();
    assert_ne!(
        response.status(),
        StatusCode::TOO_MANY_REQUESTS,
        "Key B should have its own quota"
    );
}

#[tokio::test]
async fn test_missing_api_key_is_rejected() {
    let server = create_test_server(100).await;
    let app = server.router();

    let request = Request::builder()
        .uri("/api/registrations/event/7")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_api_key_is_rejected() {
    let server = create_test_server(100).await;
    let app = server.router();

    let response = app
        .oneshot(api_request("ck_definitely_not_valid"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bootstrap_only_works_once() {
    let server = create_test_server(100).await;
    let app = server.router();

    bootstrap_api_key(app.clone()).await;

    let response = app.oneshot(bootstrap_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
