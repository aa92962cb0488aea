//! Route definitions for the `/approvals` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::approvals;
use crate::state::AppState;

/// Routes mounted at `/approvals`.
///
/// All routes require an admin identity (enforced by handler extractors).
///
/// ```text
/// GET    /queue           -> list_queue
/// GET    /stats           -> queue_stats
/// POST   /batch           -> batch_transition
/// POST   /{id}/{action}   -> transition_entry
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/queue", get(approvals::list_queue))
        .route("/stats", get(approvals::queue_stats))
        .route("/batch", post(approvals::batch_transition))
        .route("/{id}/{action}", post(approvals::transition_entry))
}
