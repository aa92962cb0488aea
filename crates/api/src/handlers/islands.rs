//! Handlers for the assembled island view.

use axum::extract::{Path, Query, State};
use axum::Json;
use islandboard_core::error::CoreError;
use islandboard_core::island::{self, Island};
use islandboard_core::types::Timestamp;
use islandboard_core::view::IslandRecord;
use islandboard_pipeline::RefreshReport;
use serde::Serialize;
use serde_json::Value;

use crate::error::AppResult;
use crate::query::HistoryParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Longest history window forwarded to the scraper.
const MAX_HISTORY_DAYS: u32 = 90;

/// The whole island view in registry order.
#[derive(Debug, Serialize)]
pub struct IslandsResponse {
    pub islands: Vec<IslandRecord>,
    pub backend_available: bool,
    pub mock_data_enabled: bool,
    pub version: u64,
    pub refreshed_at: Option<Timestamp>,
}

fn known_island(id: &str) -> Result<&'static Island, CoreError> {
    island::find(id).ok_or_else(|| CoreError::NotFound {
        entity: "Island",
        id: id.to_string(),
    })
}

/// GET /api/v1/islands
pub async fn list_islands(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<IslandsResponse>>> {
    let map = state.assembler.snapshot().await;
    let response = IslandsResponse {
        islands: map.ordered().into_iter().cloned().collect(),
        backend_available: map.backend_available,
        mock_data_enabled: state.assembler.mock_enabled().await,
        version: map.version,
        refreshed_at: map.refreshed_at,
    };
    Ok(Json(DataResponse { data: response }))
}

/// GET /api/v1/islands/{id}
pub async fn get_island(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<IslandRecord>>> {
    let island = known_island(&id)?;
    let record = state
        .assembler
        .island(island.id)
        .await
        .unwrap_or_else(|| IslandRecord::empty(island));
    Ok(Json(DataResponse { data: record }))
}

/// POST /api/v1/islands/refresh
///
/// Full refetch. Never fails: an unreachable scraper shows up as
/// `backend_available: false` in the report.
pub async fn refresh_islands(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<RefreshReport>>> {
    let report = state.refresher.refresh().await;
    Ok(Json(DataResponse { data: report }))
}

/// GET /api/v1/islands/{id}/latest
///
/// Proxied to the scraper; `503` when it cannot be reached.
pub async fn latest_results(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Value>>> {
    let island = known_island(&id)?;
    let latest = state.scraper().latest(island.id).await?;
    Ok(Json(DataResponse { data: latest }))
}

/// GET /api/v1/islands/{id}/history?days=N
///
/// Proxied to the scraper; `503` when it cannot be reached.
pub async fn island_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> AppResult<Json<DataResponse<Value>>> {
    let island = known_island(&id)?;
    if params.days == 0 || params.days > MAX_HISTORY_DAYS {
        return Err(CoreError::validation(
            "days",
            format!("days must be between 1 and {MAX_HISTORY_DAYS}"),
        )
        .into());
    }
    let history = state.scraper().history(island.id, params.days).await?;
    Ok(Json(DataResponse { data: history }))
}
