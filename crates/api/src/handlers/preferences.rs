use axum::extract::State;
use axum::Json;
use islandboard_core::island::{self, Island};
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SelectIslandRequest {
    #[validate(length(min = 1, max = 64))]
    pub island_id: String,
}

/// GET /api/v1/preferences/selected-island
///
/// Falls back to the first registry island when nothing valid is stored.
pub async fn get_selected_island(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<&'static Island>>> {
    let island = state.preferences.selected_island().await;
    Ok(Json(DataResponse { data: island }))
}

/// PUT /api/v1/preferences/selected-island
pub async fn set_selected_island(
    State(state): State<AppState>,
    Json(input): Json<SelectIslandRequest>,
) -> AppResult<Json<DataResponse<&'static Island>>> {
    input.validate()?;
    let island = island::require(input.island_id.trim(), "island_id")?;
    state.preferences.set_selected_island(island).await?;
    tracing::info!(island_id = island.id, "Selected island changed");
    Ok(Json(DataResponse { data: island }))
}
