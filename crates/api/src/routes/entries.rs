//! Route definitions for admin-submitted entries.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::entries;
use crate::state::AppState;

/// Routes mounted at `/entries`.
///
/// ```text
/// POST   /                -> create_entry
/// GET    /{id}            -> get_entry
/// POST   /{id}/submit     -> submit_entry
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(entries::create_entry))
        .route("/{id}", get(entries::get_entry))
        .route("/{id}/submit", post(entries::submit_entry))
}

/// Routes mounted at `/lottery`.
///
/// ```text
/// POST   /manual-entry    -> manual_entry
/// ```
pub fn lottery_router() -> Router<AppState> {
    Router::new().route("/manual-entry", post(entries::manual_entry))
}
