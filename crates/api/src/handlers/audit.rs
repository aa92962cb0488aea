use axum::extract::{Query, State};
use axum::Json;
use islandboard_core::audit::AuditLogEntry;

use crate::error::AppResult;
use crate::middleware::admin::AdminUser;
use crate::query::AuditParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/audit
///
/// Read the append-only audit log, oldest first. Optional `resource_id`,
/// `since` (RFC 3339) and `limit`.
pub async fn list_audit(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(params): Query<AuditParams>,
) -> AppResult<Json<DataResponse<Vec<AuditLogEntry>>>> {
    let records = state.queue.audit_log(&params.into()).await?;
    Ok(Json(DataResponse { data: records }))
}
