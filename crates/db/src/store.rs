//! Persisted-store interface.

use async_trait::async_trait;
use islandboard_core::audit::AuditLogEntry;
use islandboard_core::entry::{ApprovalStatus, DataEntry, DataType};
use islandboard_core::types::{EntryId, Timestamp};

use crate::error::StoreError;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Filter for listing entries. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryQuery {
    /// Any of these statuses; empty matches all.
    pub statuses: Vec<ApprovalStatus>,
    pub data_type: Option<DataType>,
    pub island_id: Option<String>,
    /// Skip soft-deleted entries.
    pub active_only: bool,
}

impl EntryQuery {
    pub fn with_status(status: ApprovalStatus) -> Self {
        Self {
            statuses: vec![status],
            active_only: true,
            ..Self::default()
        }
    }

    /// Active entries that may be shown as real data.
    pub fn displayable() -> Self {
        Self {
            statuses: vec![ApprovalStatus::Approved, ApprovalStatus::Published],
            active_only: true,
            ..Self::default()
        }
    }

    pub fn matches(&self, entry: &DataEntry) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&entry.status()))
            && self.data_type.is_none_or(|t| t == entry.data_type)
            && self
                .island_id
                .as_deref()
                .is_none_or(|i| i.eq_ignore_ascii_case(&entry.island_id))
            && (!self.active_only || entry.is_active)
    }
}

/// Filter for reading the audit log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditQuery {
    pub resource_id: Option<EntryId>,
    /// Only records at or after this instant.
    pub since: Option<Timestamp>,
    pub limit: Option<i64>,
}

impl AuditQuery {
    pub fn matches(&self, record: &AuditLogEntry) -> bool {
        self.resource_id
            .as_deref()
            .is_none_or(|id| id == record.resource_id)
            && self.since.is_none_or(|since| record.timestamp >= since)
    }
}

/// Storage for data entries and their append-only audit log.
///
/// Plain writes are last-write-wins; transitions are compare-and-set on
/// the stored status. Timestamps that the store owns
/// (`updated_at`, `reviewed_at`, audit `timestamp`) are stamped by the
/// store at commit time; returned entries carry the stored values.
///
/// Implementations:
/// - [`crate::MemoryStore`]: in-process maps
/// - [`crate::PgStore`]: PostgreSQL
#[async_trait]
pub trait EntryStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<DataEntry>>;

    /// Entries matching `query`, oldest `created_at` first.
    async fn list(&self, query: &EntryQuery) -> Result<Vec<DataEntry>>;

    /// Insert `entry` unless an entry with the same id exists.
    ///
    /// Returns whether the entry was inserted.
    async fn insert(&self, entry: &DataEntry) -> Result<bool>;

    /// Create or overwrite `entry`.
    async fn put(&self, entry: &DataEntry) -> Result<DataEntry>;

    /// Persist a transitioned entry and append its audit record as one
    /// write, provided the stored status is still `expected`.
    ///
    /// Fails with [`StoreError::NotFound`] if the entry is unknown and with
    /// [`StoreError::StatusChanged`] if another writer moved it first. On
    /// failure nothing is written.
    async fn commit_transition(
        &self,
        expected: ApprovalStatus,
        entry: &DataEntry,
        audit: &AuditLogEntry,
    ) -> Result<DataEntry>;

    /// Audit records matching `query`, oldest first.
    async fn list_audit(&self, query: &AuditQuery) -> Result<Vec<AuditLogEntry>>;

    /// Verify the store is reachable.
    async fn health(&self) -> Result<()>;
}
