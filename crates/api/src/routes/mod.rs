pub mod approvals;
pub mod audit;
pub mod entries;
pub mod health;
pub mod islands;
pub mod live;
pub mod preferences;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /entries        -> entries::router()
/// /lottery        -> entries::lottery_router()
/// /approvals      -> approvals::router()
/// /audit          -> audit::router()
/// /islands        -> islands::router()
/// /live           -> live::router()
/// /preferences    -> preferences::router()
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/entries", entries::router())
        .nest("/lottery", entries::lottery_router())
        .nest("/approvals", approvals::router())
        .nest("/audit", audit::router())
        .nest("/islands", islands::router())
        .nest("/live", live::router())
        .nest("/preferences", preferences::router())
}
