use axum::routing::get;
use axum::Router;

use crate::handlers::live;
use crate::state::AppState;

/// Routes mounted at `/live`.
///
/// ```text
/// GET    /status          -> live_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/status", get(live::live_status))
}
