//! Postgres-backed [`EntryStore`].

use async_trait::async_trait;
use islandboard_core::audit::AuditLogEntry;
use islandboard_core::entry::{ApprovalStatus, DataEntry};

use crate::error::StoreError;
use crate::models::audit::AuditLogRow;
use crate::models::entry::DataEntryRow;
use crate::repositories::{AuditLogRepo, DataEntryRepo};
use crate::store::{AuditQuery, EntryQuery, EntryStore, Result};
use crate::DbPool;

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl EntryStore for PgStore {
    async fn get(&self, id: &str) -> Result<Option<DataEntry>> {
        DataEntryRepo::find_by_id(&self.pool, id)
            .await?
            .map(DataEntry::try_from)
            .transpose()
    }

    async fn list(&self, query: &EntryQuery) -> Result<Vec<DataEntry>> {
        DataEntryRepo::list(&self.pool, query)
            .await?
            .into_iter()
            .map(DataEntry::try_from)
            .collect()
    }

    async fn insert(&self, entry: &DataEntry) -> Result<bool> {
        let row = DataEntryRow::from_entry(entry)?;
        Ok(DataEntryRepo::insert_if_absent(&self.pool, &row).await?)
    }

    async fn put(&self, entry: &DataEntry) -> Result<DataEntry> {
        let row = DataEntryRow::from_entry(entry)?;
        DataEntryRepo::upsert(&self.pool, &row).await?.try_into()
    }

    async fn commit_transition(
        &self,
        expected: ApprovalStatus,
        entry: &DataEntry,
        audit: &AuditLogEntry,
    ) -> Result<DataEntry> {
        let row = DataEntryRow::from_entry(entry)?;
        let stamp_submitted = entry.status() == ApprovalStatus::PendingApproval;

        let mut tx = self.pool.begin().await?;
        let updated =
            DataEntryRepo::update_approval(&mut *tx, &row, expected.as_str(), stamp_submitted)
                .await?;
        let Some(stored) = updated else {
            // Dropping the transaction rolls it back.
            return Err(match DataEntryRepo::find_status(&mut *tx, &entry.id).await? {
                Some(actual) => StoreError::StatusChanged {
                    id: entry.id.clone(),
                    expected,
                    actual,
                },
                None => StoreError::NotFound(entry.id.clone()),
            });
        };
        AuditLogRepo::insert(&mut *tx, &AuditLogRow::from(audit)).await?;
        tx.commit().await?;

        tracing::debug!(entry_id = %entry.id, action = %audit.action, "Transition committed");
        stored.try_into()
    }

    async fn list_audit(&self, query: &AuditQuery) -> Result<Vec<AuditLogEntry>> {
        AuditLogRepo::list(&self.pool, query)
            .await?
            .into_iter()
            .map(AuditLogEntry::try_from)
            .collect()
    }

    async fn health(&self) -> Result<()> {
        Ok(crate::health_check(&self.pool).await?)
    }
}
