//! In-memory [`EntryStore`] used in development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use islandboard_core::audit::AuditLogEntry;
use islandboard_core::entry::{ApprovalStatus, DataEntry};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::{AuditQuery, EntryQuery, EntryStore, Result};

#[derive(Default)]
struct Inner {
    entries: HashMap<String, DataEntry>,
    audit: Vec<AuditLogEntry>,
}

/// Store that keeps entries and the audit log in process memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entry_count(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn audit_count(&self) -> usize {
        self.inner.read().await.audit.len()
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<DataEntry>> {
        Ok(self.inner.read().await.entries.get(id).cloned())
    }

    async fn list(&self, query: &EntryQuery) -> Result<Vec<DataEntry>> {
        let inner = self.inner.read().await;
        let mut entries: Vec<DataEntry> = inner
            .entries
            .values()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(entries)
    }

    async fn insert(&self, entry: &DataEntry) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if inner.entries.contains_key(&entry.id) {
            return Ok(false);
        }
        inner.entries.insert(entry.id.clone(), entry.clone());
        Ok(true)
    }

    async fn put(&self, entry: &DataEntry) -> Result<DataEntry> {
        let mut stored = entry.clone();
        stored.updated_at = Utc::now();
        self.inner
            .write()
            .await
            .entries
            .insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn commit_transition(
        &self,
        expected: ApprovalStatus,
        entry: &DataEntry,
        audit: &AuditLogEntry,
    ) -> Result<DataEntry> {
        let mut inner = self.inner.write().await;
        let actual = inner
            .entries
            .get(&entry.id)
            .map(DataEntry::status)
            .ok_or_else(|| StoreError::NotFound(entry.id.clone()))?;
        if actual != expected {
            return Err(StoreError::StatusChanged {
                id: entry.id.clone(),
                expected,
                actual: actual.to_string(),
            });
        }

        let now = Utc::now();
        let mut stored = entry.clone();
        stored.updated_at = now;
        if stored.approval.reviewed_at.is_some() {
            stored.approval.reviewed_at = Some(now);
        }
        if stored.status() == ApprovalStatus::PendingApproval {
            stored.submitted_at = Some(now);
        }
        let mut record = audit.clone();
        record.timestamp = now;

        inner.entries.insert(stored.id.clone(), stored.clone());
        inner.audit.push(record);
        Ok(stored)
    }

    async fn list_audit(&self, query: &AuditQuery) -> Result<Vec<AuditLogEntry>> {
        let inner = self.inner.read().await;
        let mut records: Vec<AuditLogEntry> = inner
            .audit
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.timestamp);
        if let Some(limit) = query.limit.and_then(|l| usize::try_from(l).ok()) {
            records.truncate(limit);
        }
        Ok(records)
    }

    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{NaiveDate, TimeZone};
    use islandboard_core::approval::{self, ApprovalAction, TransitionRequest};
    use islandboard_core::entry::{
        ApprovalInfo, ApprovalLevel, DataSource, DataType, LotteryDraw, Payload,
    };

    use super::*;

    fn entry(id: &str, day: u32) -> DataEntry {
        let created = Utc.with_ymd_and_hms(2024, 6, day, 8, 0, 0).unwrap();
        DataEntry {
            id: id.into(),
            island_id: "trinidad".into(),
            data_type: DataType::Lottery,
            source: DataSource::Scraper,
            payload: Payload::Lottery(LotteryDraw {
                game: "Play Whe".into(),
                numbers: vec![12],
                draw_date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
                jackpot: None,
                currency: None,
                draw_number: None,
                draw_time: None,
            }),
            approval: ApprovalInfo::draft(ApprovalLevel::IslandAdmin),
            created_at: created,
            updated_at: created,
            is_active: true,
            submitted_at: None,
            submitted_by: None,
            warnings: Vec::new(),
        }
    }

    #[tokio::test]
    async fn insert_is_first_write_only() {
        let store = MemoryStore::new();
        assert!(store.insert(&entry("a", 1)).await.unwrap());
        assert!(!store.insert(&entry("a", 2)).await.unwrap());
        let stored = store.get("a").await.unwrap().unwrap();
        assert_eq!(stored.created_at.date_naive(), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    }

    #[tokio::test]
    async fn list_filters_and_orders_by_creation() {
        let store = MemoryStore::new();
        store.insert(&entry("late", 3)).await.unwrap();
        store.insert(&entry("early", 1)).await.unwrap();
        let mut approved = entry("approved", 2);
        approved.approval.status = ApprovalStatus::Approved;
        store.insert(&approved).await.unwrap();

        let drafts = store
            .list(&EntryQuery::with_status(ApprovalStatus::Draft))
            .await
            .unwrap();
        let ids: Vec<_> = drafts.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["early", "late"]);
        assert_eq!(store.list(&EntryQuery::displayable()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn commit_appends_exactly_one_audit_record() {
        let store = MemoryStore::new();
        let draft = entry("a", 1);
        store.insert(&draft).await.unwrap();

        let t = approval::apply(
            &draft,
            &TransitionRequest {
                action: ApprovalAction::Submit,
                actor: None,
                notes: None,
            },
            Utc::now(),
        )
        .unwrap();
        let stored = store
            .commit_transition(ApprovalStatus::Draft, &t.entry, &t.audit)
            .await
            .unwrap();

        assert_eq!(stored.status(), ApprovalStatus::PendingApproval);
        assert_eq!(store.audit_count().await, 1);
        let log = store
            .list_audit(&AuditQuery {
                resource_id: Some("a".into()),
                ..AuditQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(log[0].timestamp, stored.updated_at);
    }

    #[tokio::test]
    async fn commit_for_unknown_entry_fails_without_audit() {
        let store = MemoryStore::new();
        let draft = entry("ghost", 1);
        let t = approval::apply(
            &draft,
            &TransitionRequest {
                action: ApprovalAction::Submit,
                actor: None,
                notes: None,
            },
            Utc::now(),
        )
        .unwrap();
        assert_matches!(
            store
                .commit_transition(ApprovalStatus::Draft, &t.entry, &t.audit)
                .await,
            Err(StoreError::NotFound(_))
        );
        assert_eq!(store.audit_count().await, 0);
    }

    #[tokio::test]
    async fn commit_against_moved_status_is_refused_without_audit() {
        let store = MemoryStore::new();
        let draft = entry("a", 1);
        store.insert(&draft).await.unwrap();
        let t = approval::apply(
            &draft,
            &TransitionRequest {
                action: ApprovalAction::Submit,
                actor: None,
                notes: None,
            },
            Utc::now(),
        )
        .unwrap();

        // Another writer archives the entry first.
        let mut archived = draft.clone();
        archived.approval.status = ApprovalStatus::Archived;
        store.put(&archived).await.unwrap();

        assert_matches!(
            store
                .commit_transition(ApprovalStatus::Draft, &t.entry, &t.audit)
                .await,
            Err(StoreError::StatusChanged { expected: ApprovalStatus::Draft, ref actual, .. })
                if actual == "archived"
        );
        assert_eq!(
            store.get("a").await.unwrap().unwrap().status(),
            ApprovalStatus::Archived
        );
        assert_eq!(store.audit_count().await, 0);
    }
}
