//! Append-only audit records for approval actions.
//!
//! An [`AuditLogEntry`] is produced by every successful state-machine
//! transition and is never updated or deleted afterwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{EntryId, Timestamp};

/// Identity recorded for transitions nobody in particular triggered
/// (scraper ingestion).
pub const SYSTEM_USER: &str = "system";

/// What happened to the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Submitted,
    Approved,
    Rejected,
    RequestedChanges,
    Published,
    Archived,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::RequestedChanges => "REQUESTED_CHANGES",
            Self::Published => "PUBLISHED",
            Self::Archived => "ARCHIVED",
        }
    }

    /// Actions that close a review (count towards approval-time statistics).
    pub fn is_review(self) -> bool {
        matches!(
            self,
            Self::Approved | Self::Rejected | Self::RequestedChanges
        )
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUBMITTED" => Ok(Self::Submitted),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            "REQUESTED_CHANGES" => Ok(Self::RequestedChanges),
            "PUBLISHED" => Ok(Self::Published),
            "ARCHIVED" => Ok(Self::Archived),
            other => Err(CoreError::validation(
                "action",
                format!("Unknown audit action '{other}'"),
            )),
        }
    }
}

/// One immutable audit record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditLogEntry {
    pub id: String,
    pub user_id: String,
    pub user_email: String,
    pub action: AuditAction,
    /// The entry's data type, e.g. `"lottery"`.
    pub resource_type: String,
    pub resource_id: EntryId,
    /// `{ from, to, island_id, notes }`.
    pub details: serde_json::Value,
    pub timestamp: Timestamp,
    pub ip_address: Option<String>,
}

impl AuditLogEntry {
    /// Island the audited entry belongs to, as recorded in `details`.
    pub fn island_id(&self) -> Option<&str> {
        self.details.get("island_id").and_then(|v| v.as_str())
    }
}
