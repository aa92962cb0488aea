//! Handlers for admin-submitted entries.
//!
//! New records are normalized and stored as drafts; a separate submit
//! moves them into the approval queue.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use islandboard_core::entry::{DataEntry, DataType};
use islandboard_core::error::CoreError;
use islandboard_pipeline::NewEntry;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::admin::AdminUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEntryRequest {
    #[validate(length(min = 1, max = 32))]
    pub data_type: String,
    #[validate(length(min = 1, max = 64))]
    pub island_id: String,
    /// Origin-shaped record body.
    pub body: Value,
}

/// A lottery record; every field besides `island_id` is passed through to
/// the normalizer.
#[derive(Debug, Deserialize, Validate)]
pub struct ManualEntryRequest {
    #[validate(length(min = 1, max = 64))]
    pub island_id: String,
    #[serde(flatten)]
    pub record: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct ManualEntryResponse {
    pub entry: DataEntry,
    /// Whether the scraper accepted the forwarded record.
    pub forwarded: bool,
}

/// Island admins may only create entries for islands in their scope.
fn ensure_scope(admin: &AdminUser, island_id: &str) -> Result<(), AppError> {
    if admin.actor().can_act_on(island_id) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!(
            "{} may not submit data for island '{island_id}'",
            admin.email
        ))
        .into())
    }
}

/// POST /api/v1/entries
///
/// Normalize a raw record and store it as a draft.
pub async fn create_entry(
    admin: AdminUser,
    State(state): State<AppState>,
    Json(input): Json<CreateEntryRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let data_type: DataType = input.data_type.trim().parse()?;
    if !input.body.is_object() {
        return Err(AppError::BadRequest("body must be a JSON object".into()));
    }
    ensure_scope(&admin, &input.island_id)?;

    let entry = state
        .queue
        .create_draft(NewEntry {
            data_type,
            island_id: input.island_id,
            body: input.body,
        })
        .await?;

    tracing::info!(admin = %admin.email, entry_id = %entry.id, "Entry created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: entry })))
}

/// GET /api/v1/entries/{id}
pub async fn get_entry(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<DataEntry>>> {
    let entry = state.queue.get_entry(&id).await?;
    Ok(Json(DataResponse { data: entry }))
}

/// POST /api/v1/entries/{id}/submit
///
/// Move a draft, or an entry returned for changes, into the review queue.
pub async fn submit_entry(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<DataEntry>>> {
    let entry = state.queue.submit(&id, Some(admin.actor())).await?;
    Ok(Json(DataResponse { data: entry }))
}

/// POST /api/v1/lottery/manual-entry
///
/// Store a manually keyed lottery draw as a draft and forward it to the
/// scraper. Forwarding is best-effort; the draft is kept either way.
pub async fn manual_entry(
    admin: AdminUser,
    State(state): State<AppState>,
    Json(input): Json<ManualEntryRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    ensure_scope(&admin, &input.island_id)?;

    let mut record = input.record;
    record
        .entry("source")
        .or_insert_with(|| Value::String("manual".into()));
    let body = Value::Object(record);

    let entry = state
        .queue
        .create_draft(NewEntry {
            data_type: DataType::Lottery,
            island_id: input.island_id.clone(),
            body: body.clone(),
        })
        .await?;

    let mut forward = body;
    if let Value::Object(map) = &mut forward {
        map.insert("island".into(), Value::String(entry.island_id.clone()));
    }
    let forwarded = match state.scraper().manual_entry(&forward).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(entry_id = %entry.id, error = %e, "Failed to forward manual entry to scraper");
            false
        }
    };

    tracing::info!(admin = %admin.email, entry_id = %entry.id, forwarded, "Manual lottery entry stored");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: ManualEntryResponse { entry, forwarded },
        }),
    ))
}
