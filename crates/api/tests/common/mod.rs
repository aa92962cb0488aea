#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use chrono::FixedOffset;
use http_body_util::BodyExt;
use islandboard_api::config::{DashboardConfig, ServerConfig};
use islandboard_api::router::build_app_router;
use islandboard_api::state::AppState;
use islandboard_db::MemoryStore;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

/// A scraper address nothing listens on.
pub const UNREACHABLE_SCRAPER: &str = "http://127.0.0.1:9";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
    }
}

pub fn dashboard_config(dir: &TempDir, mock_data_enabled: bool) -> DashboardConfig {
    DashboardConfig {
        api_base_url: UNREACHABLE_SCRAPER.to_string(),
        ws_url: "ws://127.0.0.1:9/ws".to_string(),
        request_timeout: Duration::from_millis(500),
        auto_refresh_interval: None,
        mock_data_enabled,
        reconnect_delay: Duration::from_millis(100),
        preferences_path: dir.path().join("preferences.json"),
        database_url: None,
        local_offset: FixedOffset::east_opt(0).unwrap(),
    }
}

/// The router plus the state behind it, backed by an in-memory store.
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    _dir: TempDir,
}

/// Build the full application router (same middleware stack as
/// production) over a fresh in-memory store and an unreachable scraper.
pub async fn build_test_app() -> TestApp {
    build_test_app_with_mock(true).await
}

pub async fn build_test_app_with_mock(mock_data_enabled: bool) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        test_config(),
        dashboard_config(&dir, mock_data_enabled),
        store.clone(),
    )
    .unwrap();
    state.refresher.refresh().await;

    TestApp {
        app: build_app_router(state.clone(), &test_config()),
        state,
        store,
        _dir: dir,
    }
}

/// Admin identity headers for a request.
#[derive(Debug, Clone)]
pub struct Admin {
    pub id: &'static str,
    pub email: &'static str,
    pub level: &'static str,
    pub islands: &'static str,
}

pub fn island_admin() -> Admin {
    Admin {
        id: "u-1",
        email: "reviewer@example.com",
        level: "island_admin",
        islands: "jamaica,barbados",
    }
}

pub fn super_admin() -> Admin {
    Admin {
        id: "u-9",
        email: "super@example.com",
        level: "super_admin",
        islands: "",
    }
}

fn request(method: Method, uri: &str, admin: Option<&Admin>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(admin) = admin {
        builder = builder
            .header("x-admin-id", admin.id)
            .header("x-admin-email", admin.email)
            .header("x-admin-level", admin.level)
            .header("x-admin-islands", admin.islands)
            .header("x-forwarded-for", "10.0.0.1, 172.16.0.1");
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, request(Method::GET, uri, None, None)).await
}

pub async fn get_as(app: &Router, uri: &str, admin: &Admin) -> Response<Body> {
    send(app, request(Method::GET, uri, Some(admin), None)).await
}

pub async fn post_as(app: &Router, uri: &str, admin: &Admin, body: Option<Value>) -> Response<Body> {
    send(app, request(Method::POST, uri, Some(admin), body)).await
}

pub async fn post(app: &Router, uri: &str, body: Option<Value>) -> Response<Body> {
    send(app, request(Method::POST, uri, None, body)).await
}

pub async fn put(app: &Router, uri: &str, body: Value) -> Response<Body> {
    send(app, request(Method::PUT, uri, None, Some(body))).await
}

async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the standard error envelope and return it.
pub async fn expect_error(response: Response<Body>, status: StatusCode, code: &str) -> Value {
    assert_eq!(response.status(), status);
    let json = body_json(response).await;
    assert_eq!(json["code"], code, "unexpected error body: {json}");
    assert!(json["error"].is_string());
    assert!(json["retryable"].is_boolean());
    json
}

/// A Jamaican lottery record in store-document spelling.
pub fn lottery_body(game: &str) -> Value {
    json!({
        "gameName": game,
        "winningNumbers": [4, 8, 15, 16, 23],
        "drawDate": "2024-06-01",
    })
}

/// Create and submit a Jamaican lottery entry; returns its id.
pub async fn pending_entry(app: &Router, game: &str) -> String {
    let admin = island_admin();
    let created = post_as(
        app,
        "/api/v1/entries",
        &admin,
        Some(json!({
            "data_type": "lottery",
            "island_id": "jamaica",
            "body": lottery_body(game),
        })),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let id = body_json(created).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let submitted = post_as(app, &format!("/api/v1/entries/{id}/submit"), &admin, None).await;
    assert_eq!(submitted.status(), StatusCode::OK);
    id
}
