//! Service health.
//!
//! Health is always reported with `200 OK`; a failing dependency turns
//! the status into `degraded` rather than an error.

use axum::extract::State;
use axum::Json;
use islandboard_live::ConnectionState;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<E: std::fmt::Display> From<Result<(), E>> for ComponentHealth {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self {
                healthy: true,
                error: None,
            },
            Err(e) => Self {
                healthy: false,
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub store: ComponentHealth,
    pub scraper: ComponentHealth,
    pub live: ConnectionState,
    pub mock_data_enabled: bool,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (store, scraper) = tokio::join!(state.store.health(), state.scraper().health());
    let store = ComponentHealth::from(store);
    let scraper = ComponentHealth::from(scraper.map(|_| ()));
    let live = state
        .live
        .as_ref()
        .map_or(ConnectionState::Disconnected, |live| live.state());

    let live_ok = state.live.is_none() || live == ConnectionState::Connected;
    let status = if store.healthy && scraper.healthy && live_ok {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        store,
        scraper,
        live,
        mock_data_enabled: state.dashboard.mock_data_enabled,
    })
}
