//! Row model for the append-only `audit_logs` table.
//!
//! Audit rows have no `updated_at`; they are never modified.

use islandboard_core::audit::AuditLogEntry;
use islandboard_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

use crate::error::StoreError;

/// A row from the `audit_logs` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct AuditLogRow {
    pub id: String,
    pub user_id: String,
    pub user_email: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub details: serde_json::Value,
    pub timestamp: Timestamp,
    pub ip_address: Option<String>,
}

impl From<&AuditLogEntry> for AuditLogRow {
    fn from(entry: &AuditLogEntry) -> Self {
        Self {
            id: entry.id.clone(),
            user_id: entry.user_id.clone(),
            user_email: entry.user_email.clone(),
            action: entry.action.as_str().to_string(),
            resource_type: entry.resource_type.clone(),
            resource_id: entry.resource_id.clone(),
            details: entry.details.clone(),
            timestamp: entry.timestamp,
            ip_address: entry.ip_address.clone(),
        }
    }
}

impl TryFrom<AuditLogRow> for AuditLogEntry {
    type Error = StoreError;

    fn try_from(row: AuditLogRow) -> Result<Self, Self::Error> {
        let action = row.action.parse().map_err(|e| StoreError::Corrupt {
            id: row.id.clone(),
            message: format!("{e}"),
        })?;
        Ok(AuditLogEntry {
            id: row.id,
            user_id: row.user_id,
            user_email: row.user_email,
            action,
            resource_type: row.resource_type,
            resource_id: row.resource_id,
            details: row.details,
            timestamp: row.timestamp,
            ip_address: row.ip_address,
        })
    }
}
