//! Row model for the `data_entries` table.

use islandboard_core::entry::{ApprovalInfo, DataEntry, NormalizationWarning, Payload};
use islandboard_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::StoreError;

/// A row from the `data_entries` table.
///
/// Enumerations are stored as their snake_case strings; the payload and
/// warnings as JSONB.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct DataEntryRow {
    pub id: String,
    pub island_id: String,
    pub data_type: String,
    pub source: String,
    pub payload: serde_json::Value,
    pub status: String,
    pub approval_level: String,
    pub change_requests: Option<String>,
    pub reviewed_at: Option<Timestamp>,
    pub reviewed_by: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub is_active: bool,
    pub submitted_at: Option<Timestamp>,
    pub submitted_by: Option<String>,
    pub warnings: serde_json::Value,
}

/// Stored shape of a [`NormalizationWarning`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredWarning {
    field: String,
    message: String,
}

impl DataEntryRow {
    pub fn from_entry(entry: &DataEntry) -> Result<Self, StoreError> {
        let warnings: Vec<StoredWarning> = entry
            .warnings
            .iter()
            .map(|w| StoredWarning {
                field: w.field.clone(),
                message: w.message.clone(),
            })
            .collect();

        Ok(Self {
            id: entry.id.clone(),
            island_id: entry.island_id.clone(),
            data_type: entry.data_type.as_str().to_string(),
            source: entry.source.as_str().to_string(),
            payload: serde_json::to_value(&entry.payload)?,
            status: entry.approval.status.as_str().to_string(),
            approval_level: entry.approval.approval_level.as_str().to_string(),
            change_requests: entry.approval.change_requests.clone(),
            reviewed_at: entry.approval.reviewed_at,
            reviewed_by: entry.approval.reviewed_by.clone(),
            created_at: entry.created_at,
            updated_at: entry.updated_at,
            is_active: entry.is_active,
            submitted_at: entry.submitted_at,
            submitted_by: entry.submitted_by.clone(),
            warnings: serde_json::to_value(warnings)?,
        })
    }
}

impl TryFrom<DataEntryRow> for DataEntry {
    type Error = StoreError;

    fn try_from(row: DataEntryRow) -> Result<Self, Self::Error> {
        let corrupt = |message: String| StoreError::Corrupt {
            id: row.id.clone(),
            message,
        };

        let data_type = row.data_type.parse().map_err(|e| corrupt(format!("{e}")))?;
        let payload = Payload::from_value(data_type, row.payload.clone())
            .map_err(|e| corrupt(format!("payload: {e}")))?;
        let warnings: Vec<StoredWarning> = serde_json::from_value(row.warnings.clone())
            .map_err(|e| corrupt(format!("warnings: {e}")))?;

        Ok(DataEntry {
            island_id: row.island_id.clone(),
            data_type,
            source: row.source.parse().map_err(|e| corrupt(format!("{e}")))?,
            payload,
            approval: ApprovalInfo {
                status: row.status.parse().map_err(|e| corrupt(format!("{e}")))?,
                approval_level: row
                    .approval_level
                    .parse()
                    .map_err(|e| corrupt(format!("{e}")))?,
                change_requests: row.change_requests.clone(),
                reviewed_at: row.reviewed_at,
                reviewed_by: row.reviewed_by.clone(),
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
            is_active: row.is_active,
            submitted_at: row.submitted_at,
            submitted_by: row.submitted_by.clone(),
            warnings: warnings
                .into_iter()
                .map(|w| NormalizationWarning {
                    field: w.field,
                    message: w.message,
                })
                .collect(),
            id: row.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use islandboard_core::entry::{
        ApprovalLevel, ApprovalStatus, CommodityPrice, DataSource, DataType,
    };

    use super::*;

    fn commodity() -> DataEntry {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        DataEntry {
            id: "guyana-commodity-ab12".into(),
            island_id: "guyana".into(),
            data_type: DataType::Commodity,
            source: DataSource::AdminEntry,
            payload: Payload::Commodity(CommodityPrice {
                commodity: "Sugar".into(),
                price: 320.0,
                currency: Some("USD".into()),
                unit: Some("kg".into()),
            }),
            approval: ApprovalInfo {
                status: ApprovalStatus::RequiresChanges,
                approval_level: ApprovalLevel::SuperAdmin,
                change_requests: Some("price looks off".into()),
                reviewed_at: Some(at),
                reviewed_by: Some("rev@example.com".into()),
            },
            created_at: at,
            updated_at: at,
            is_active: true,
            submitted_at: Some(at),
            submitted_by: Some("ops@example.com".into()),
            warnings: vec![NormalizationWarning {
                field: "currency".into(),
                message: "Currency 'USD' does not match".into(),
            }],
        }
    }

    #[test]
    fn row_maps_back_to_the_same_entry() {
        let entry = commodity();
        let row = DataEntryRow::from_entry(&entry).unwrap();
        assert_eq!(row.status, "requires_changes");
        assert_eq!(row.approval_level, "super_admin");
        assert_eq!(row.payload["commodity"], "Sugar");
        assert_eq!(DataEntry::try_from(row).unwrap(), entry);
    }

    #[test]
    fn unknown_status_is_corrupt() {
        let mut row = DataEntryRow::from_entry(&commodity()).unwrap();
        row.status = "live".into();
        assert_matches!(DataEntry::try_from(row), Err(StoreError::Corrupt { .. }));
    }

    #[test]
    fn payload_not_matching_type_is_corrupt() {
        let mut row = DataEntryRow::from_entry(&commodity()).unwrap();
        row.data_type = "lottery".into();
        assert_matches!(DataEntry::try_from(row), Err(StoreError::Corrupt { ref message, .. }) if message.starts_with("payload"));
    }
}
