use axum::extract::State;
use axum::Json;
use islandboard_live::ConnectionState;
use serde::Serialize;

use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LiveStatus {
    /// Whether a live channel was started for this session.
    pub enabled: bool,
    pub state: ConnectionState,
    pub ws_url: String,
    pub islands: Vec<String>,
}

/// GET /api/v1/live/status
pub async fn live_status(State(state): State<AppState>) -> Json<DataResponse<LiveStatus>> {
    let status = match &state.live {
        Some(live) => LiveStatus {
            enabled: !live.is_stopped(),
            state: live.state(),
            ws_url: state.dashboard.ws_url.clone(),
            islands: live.islands().to_vec(),
        },
        None => LiveStatus {
            enabled: false,
            state: ConnectionState::Disconnected,
            ws_url: state.dashboard.ws_url.clone(),
            islands: Vec::new(),
        },
    };
    Json(DataResponse { data: status })
}
