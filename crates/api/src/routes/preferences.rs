use axum::routing::get;
use axum::Router;

use crate::handlers::preferences;
use crate::state::AppState;

/// Routes mounted at `/preferences`.
///
/// ```text
/// GET    /selected-island -> get_selected_island
/// PUT    /selected-island -> set_selected_island
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/selected-island",
        get(preferences::get_selected_island).put(preferences::set_selected_island),
    )
}
