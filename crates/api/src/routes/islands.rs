//! Route definitions for the island view.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::islands;
use crate::state::AppState;

/// Routes mounted at `/islands`.
///
/// ```text
/// GET    /                -> list_islands
/// POST   /refresh         -> refresh_islands
/// GET    /{id}            -> get_island
/// GET    /{id}/latest     -> latest_results
/// GET    /{id}/history    -> island_history
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(islands::list_islands))
        .route("/refresh", post(islands::refresh_islands))
        .route("/{id}", get(islands::get_island))
        .route("/{id}/latest", get(islands::latest_results))
        .route("/{id}/history", get(islands::island_history))
}
