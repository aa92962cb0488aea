//! Integration tests for the health check endpoint and general HTTP behaviour.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{body_json, get};
use tower::ServiceExt;

#[tokio::test]
async fn health_is_degraded_without_scraper_but_still_200() {
    let t = common::build_test_app().await;
    let response = get(&t.app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert!(json["version"].is_string());
    assert_eq!(json["store"]["healthy"], true);
    assert_eq!(json["scraper"]["healthy"], false);
    assert!(json["scraper"]["error"].is_string());
    assert_eq!(json["live"], "disconnected");
    assert_eq!(json["mock_data_enabled"], true);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let t = common::build_test_app().await;
    let response = get(&t.app, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn request_id_is_generated_and_propagated() {
    let t = common::build_test_app().await;

    let response = get(&t.app, "/api/v1/live/status").await;
    assert!(response.headers().contains_key("x-request-id"));

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/live/status")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-42");
}

#[tokio::test]
async fn live_status_without_channel_is_disabled() {
    let t = common::build_test_app().await;
    let json = body_json(get(&t.app, "/api/v1/live/status").await).await;

    assert_eq!(json["data"]["enabled"], false);
    assert_eq!(json["data"]["state"], "disconnected");
    assert_eq!(json["data"]["ws_url"], "ws://127.0.0.1:9/ws");
}
