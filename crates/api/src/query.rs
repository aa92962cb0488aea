//! Shared query parameter types for API handlers.
//!
//! Enum-valued parameters arrive as strings and are parsed with the
//! domain `FromStr` impls so a bad value yields the standard JSON
//! validation error instead of a plain-text rejection.

use chrono::{DateTime, Utc};
use islandboard_core::entry::{ApprovalStatus, DataType};
use islandboard_core::error::CoreError;
use islandboard_core::queue::{QueueFilter, DEFAULT_PAGE_SIZE};
use islandboard_db::AuditQuery;
use serde::Deserialize;

/// `GET /approvals/queue` parameters.
#[derive(Debug, Default, Deserialize)]
pub struct QueueParams {
    pub status: Option<String>,
    pub data_type: Option<String>,
    pub island: Option<String>,
    pub search: Option<String>,
    /// Zero-indexed.
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl QueueParams {
    pub fn filter(&self) -> Result<QueueFilter, CoreError> {
        Ok(QueueFilter {
            status: non_empty(&self.status)
                .map(str::parse::<ApprovalStatus>)
                .transpose()?,
            data_type: non_empty(&self.data_type)
                .map(str::parse::<DataType>)
                .transpose()?,
            island: non_empty(&self.island).map(str::to_string),
            search: non_empty(&self.search).map(str::to_string),
        })
    }

    pub fn page(&self) -> usize {
        self.page.unwrap_or(0)
    }

    pub fn page_size(&self) -> usize {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

/// `GET /audit` parameters.
#[derive(Debug, Default, Deserialize)]
pub struct AuditParams {
    pub resource_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

impl From<AuditParams> for AuditQuery {
    fn from(params: AuditParams) -> Self {
        AuditQuery {
            resource_id: params.resource_id.filter(|id| !id.trim().is_empty()),
            since: params.since,
            limit: params.limit.map(|l| l.clamp(1, 1000)),
        }
    }
}

/// `GET /islands/{id}/history` parameters.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    #[serde(default = "default_history_days")]
    pub days: u32,
}

fn default_history_days() -> u32 {
    7
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
