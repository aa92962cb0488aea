//! Handlers for the review workflow.
//!
//! Single transitions, batch transitions, the filtered queue and its
//! statistics. Every transition is attributed to the requesting admin.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use islandboard_core::approval::{ApprovalAction, TransitionRequest};
use islandboard_core::entry::DataEntry;
use islandboard_core::queue::{ApprovalQueueItem, Page, QueueStats};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::admin::AdminUser;
use crate::query::QueueParams;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct TransitionBody {
    /// Reason for reject / request-changes; free notes otherwise.
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BatchRequest {
    #[validate(length(min = 1, max = 100))]
    pub ids: Vec<String>,
    pub action: String,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// GET /api/v1/approvals/queue
///
/// Filtered, priority-ordered and paginated queue. Query parameters:
/// `status`, `data_type`, `island`, `search`, `page`, `page_size`.
pub async fn list_queue(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(params): Query<QueueParams>,
) -> AppResult<Json<DataResponse<Page<ApprovalQueueItem>>>> {
    let filter = params.filter()?;
    let page = state
        .queue
        .list(&filter, params.page(), params.page_size(), Utc::now())
        .await?;
    Ok(Json(DataResponse { data: page }))
}

/// GET /api/v1/approvals/stats
pub async fn queue_stats(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<QueueStats>>> {
    let stats = state.queue.stats(Utc::now()).await?;
    Ok(Json(DataResponse { data: stats }))
}

/// POST /api/v1/approvals/{id}/{action}
///
/// `action` is one of `approve`, `reject`, `request-changes`, `publish`,
/// `archive`. The JSON body `{ "notes": ... }` is optional except for
/// reject and request-changes, which need a reason.
pub async fn transition_entry(
    admin: AdminUser,
    State(state): State<AppState>,
    Path((id, action)): Path<(String, String)>,
    body: Bytes,
) -> AppResult<Json<DataResponse<DataEntry>>> {
    let action: ApprovalAction = action.parse()?;
    let body: TransitionBody = if body.iter().all(u8::is_ascii_whitespace) {
        TransitionBody::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))?
    };
    body.validate()?;

    let entry = state
        .queue
        .transition(
            &id,
            TransitionRequest {
                action,
                actor: Some(admin.actor()),
                notes: body.notes,
            },
        )
        .await?;
    Ok(Json(DataResponse { data: entry }))
}

/// POST /api/v1/approvals/batch
///
/// Apply one action to many entries. Items succeed or fail independently;
/// any failure is a partial batch failure, answered with `207 Multi-Status`
/// and the same per-item report.
pub async fn batch_transition(
    admin: AdminUser,
    State(state): State<AppState>,
    Json(input): Json<BatchRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let action: ApprovalAction = input.action.parse()?;

    let report = state
        .queue
        .batch(&input.ids, action, Some(admin.actor()), input.notes)
        .await;

    tracing::info!(
        admin = %admin.email,
        action = %action,
        succeeded = report.succeeded,
        failed = report.failed,
        "Batch transition finished",
    );

    let status = report
        .failure()
        .map_or(StatusCode::OK, |e| AppError::from(e).status());
    Ok((status, Json(DataResponse { data: report })))
}
