use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use islandboard_core::approval::{Actor, ApprovalAction, TransitionRequest};
use islandboard_core::assembler::IslandViewAssembler;
use islandboard_core::audit::{AuditAction, AuditLogEntry};
use islandboard_core::entry::{ApprovalLevel, ApprovalStatus, DataEntry, DataType};
use islandboard_core::error::CoreError;
use islandboard_db::{AuditQuery, EntryQuery, EntryStore, MemoryStore, StoreError};
use islandboard_events::EventBus;
use islandboard_pipeline::{ApprovalQueue, NewEntry};
use serde_json::json;

type StoreResult<T> = Result<T, StoreError>;

/// Memory store with artificial latency. Reads return the state as of
/// the start of the delay.
struct SlowStore {
    inner: Arc<MemoryStore>,
    get_delay: Duration,
    /// Extra latency after a commit that lands in `pending_approval`.
    submit_commit_delay: Duration,
}

#[async_trait]
impl EntryStore for SlowStore {
    async fn get(&self, id: &str) -> StoreResult<Option<DataEntry>> {
        let entry = self.inner.get(id).await?;
        tokio::time::sleep(self.get_delay).await;
        Ok(entry)
    }

    async fn list(&self, query: &EntryQuery) -> StoreResult<Vec<DataEntry>> {
        self.inner.list(query).await
    }

    async fn insert(&self, entry: &DataEntry) -> StoreResult<bool> {
        self.inner.insert(entry).await
    }

    async fn put(&self, entry: &DataEntry) -> StoreResult<DataEntry> {
        self.inner.put(entry).await
    }

    async fn commit_transition(
        &self,
        expected: ApprovalStatus,
        entry: &DataEntry,
        audit: &AuditLogEntry,
    ) -> StoreResult<DataEntry> {
        let stored = self.inner.commit_transition(expected, entry, audit).await?;
        if stored.status() == ApprovalStatus::PendingApproval {
            tokio::time::sleep(self.submit_commit_delay).await;
        }
        Ok(stored)
    }

    async fn list_audit(&self, query: &AuditQuery) -> StoreResult<Vec<AuditLogEntry>> {
        self.inner.list_audit(query).await
    }

    async fn health(&self) -> StoreResult<()> {
        Ok(())
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    queue: ApprovalQueue,
}

fn harness(get_delay: Duration, submit_commit_delay: Duration) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let slow = Arc::new(SlowStore {
        inner: Arc::clone(&store),
        get_delay,
        submit_commit_delay,
    });
    let queue = ApprovalQueue::new(
        slow,
        Arc::new(IslandViewAssembler::new(false, Utc::now())),
        Arc::new(EventBus::default()),
        FixedOffset::east_opt(0).unwrap(),
    );
    Harness { store, queue }
}

fn reviewer() -> Actor {
    Actor {
        user_id: "u-1".into(),
        email: "reviewer@example.com".into(),
        level: ApprovalLevel::IslandAdmin,
        islands: vec!["jamaica".into()],
        ip_address: None,
    }
}

fn request(action: ApprovalAction, notes: Option<&str>) -> TransitionRequest {
    TransitionRequest {
        action,
        actor: Some(reviewer()),
        notes: notes.map(str::to_string),
    }
}

async fn draft(h: &Harness) -> String {
    let entry = h
        .queue
        .create_draft(NewEntry {
            data_type: DataType::Lottery,
            island_id: "jamaica".into(),
            body: json!({
                "gameName": "Lotto",
                "winningNumbers": [3, 11, 19, 24, 30, 37],
                "drawDate": "2024-06-01",
            }),
        })
        .await
        .unwrap();
    entry.id
}

async fn audit_actions(h: &Harness, id: &str) -> Vec<AuditAction> {
    h.store
        .list_audit(&AuditQuery {
            resource_id: Some(id.to_string()),
            ..AuditQuery::default()
        })
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.action)
        .collect()
}

#[tokio::test]
async fn racing_approve_and_reject_commit_only_once() {
    let h = harness(Duration::from_millis(20), Duration::ZERO);
    let id = draft(&h).await;
    h.queue.submit(&id, None).await.unwrap();

    let (approve, reject) = tokio::join!(
        h.queue.transition(&id, request(ApprovalAction::Approve, None)),
        h.queue
            .transition(&id, request(ApprovalAction::Reject, Some("Wrong draw date"))),
    );

    assert!(
        approve.is_ok() != reject.is_ok(),
        "exactly one transition may win: approve={approve:?} reject={reject:?}"
    );
    let loser = if approve.is_ok() { reject } else { approve };
    assert_matches!(loser, Err(CoreError::Conflict(_)));

    let actions = audit_actions(&h, &id).await;
    assert_eq!(actions.len(), 2, "{actions:?}");
    assert_eq!(actions[0], AuditAction::Submitted);
    assert!(!h.queue.contains(&id).await);
}

#[tokio::test]
async fn approve_in_flight_loses_to_concurrent_archive() {
    let h = harness(Duration::from_millis(20), Duration::ZERO);
    let id = draft(&h).await;
    h.queue.submit(&id, None).await.unwrap();

    let archive = async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        let mut archived = h.store.get(&id).await.unwrap().unwrap();
        archived.approval.status = ApprovalStatus::Archived;
        h.store.put(&archived).await.unwrap();
    };
    let (approve, ()) = tokio::join!(
        h.queue.transition(&id, request(ApprovalAction::Approve, None)),
        archive,
    );

    assert_matches!(approve, Err(CoreError::Conflict(_)));
    let stored = h.store.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.status(), ApprovalStatus::Archived);
    assert_eq!(audit_actions(&h, &id).await, [AuditAction::Submitted]);
    assert!(!h.queue.contains(&id).await);
}

#[tokio::test]
async fn late_submit_reconcile_does_not_requeue_an_approved_entry() {
    let h = harness(Duration::ZERO, Duration::from_millis(50));
    let id = draft(&h).await;

    // The submit commits at once but returns late; the approve commits and
    // reconciles in between.
    let approve = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.queue
            .transition(&id, request(ApprovalAction::Approve, None))
            .await
    };
    let (submitted, approved) = tokio::join!(h.queue.submit(&id, None), approve);

    assert_eq!(submitted.unwrap().status(), ApprovalStatus::PendingApproval);
    assert_eq!(approved.unwrap().status(), ApprovalStatus::Approved);
    assert!(!h.queue.contains(&id).await);
    assert_eq!(h.queue.pending_count().await, 0);
}
