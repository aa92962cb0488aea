//! The approval queue service.
//!
//! Keeps the in-memory view of entries awaiting review in step with the
//! store. Every transition re-reads the entry from the store, runs the
//! state machine, commits entry and audit record together (only if the
//! stored status is still the one the state machine saw), then updates
//! the queue view, the island view and the event bus.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, FixedOffset, Utc};
use futures::future::join_all;
use islandboard_core::approval::{self, Actor, ApprovalAction, TransitionRequest};
use islandboard_core::assembler::IslandViewAssembler;
use islandboard_core::audit::{AuditLogEntry, SYSTEM_USER};
use islandboard_core::entry::{ApprovalStatus, DataEntry, DataType};
use islandboard_core::error::CoreError;
use islandboard_core::normalizer::{self, Origin, RawRecord};
use islandboard_core::queue::{self, ApprovalQueueItem, Page, QueueFilter, QueueStats};
use islandboard_core::types::{EntryId, Timestamp};
use islandboard_db::{AuditQuery, EntryQuery, EntryStore};
use islandboard_events::{DashboardEvent, EventBus};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

/// How far back the audit log is read for statistics. Longer than the
/// stats window so reviews can be paired with earlier submissions.
const STATS_LOOKBACK_DAYS: i64 = 30;

/// A raw record submitted by an admin.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub data_type: DataType,
    pub island_id: String,
    /// Origin-shaped body; store-document field spellings are accepted.
    pub body: Value,
}

/// Outcome of one item in a batch transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItemResult {
    pub id: EntryId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ApprovalStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

/// Per-item report for a batch transition. Items are independent: a
/// failure never rolls back another item's success.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub action: ApprovalAction,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResult>,
}

impl BatchReport {
    pub fn is_partial(&self) -> bool {
        self.failed > 0
    }

    /// The report as a [`CoreError::PartialBatchFailure`] if anything failed.
    pub fn failure(&self) -> Option<CoreError> {
        self.is_partial().then_some(CoreError::PartialBatchFailure {
            succeeded: self.succeeded,
            failed: self.failed,
        })
    }
}

/// Live set of entries awaiting review.
pub struct ApprovalQueue {
    store: Arc<dyn EntryStore>,
    assembler: Arc<IslandViewAssembler>,
    bus: Arc<EventBus>,
    /// Pending entries by id. Projected into queue items on read so that
    /// age-based priority is always current.
    pending: RwLock<BTreeMap<EntryId, DataEntry>>,
    /// Offset used to decide what "today" means in statistics.
    local_offset: FixedOffset,
}

impl ApprovalQueue {
    pub fn new(
        store: Arc<dyn EntryStore>,
        assembler: Arc<IslandViewAssembler>,
        bus: Arc<EventBus>,
        local_offset: FixedOffset,
    ) -> Self {
        Self {
            store,
            assembler,
            bus,
            pending: RwLock::new(BTreeMap::new()),
            local_offset,
        }
    }

    pub fn store(&self) -> &Arc<dyn EntryStore> {
        &self.store
    }

    /// Replace the queue view with the store's pending entries.
    pub async fn load(&self) -> Result<usize, CoreError> {
        let entries = self
            .store
            .list(&EntryQuery::with_status(ApprovalStatus::PendingApproval))
            .await?;
        let pending: BTreeMap<_, _> = entries.into_iter().map(|e| (e.id.clone(), e)).collect();
        let count = pending.len();
        *self.pending.write().await = pending;
        tracing::debug!(count, "Approval queue loaded");
        Ok(count)
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.read().await.len()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.pending.read().await.contains_key(id)
    }

    /// Filtered, ordered, paginated queue.
    ///
    /// Without a status filter (or with `pending_approval`) this reads the
    /// live view; any other status is listed from the store.
    pub async fn list(
        &self,
        filter: &QueueFilter,
        page: usize,
        page_size: usize,
        now: Timestamp,
    ) -> Result<Page<ApprovalQueueItem>, CoreError> {
        let mut items: Vec<ApprovalQueueItem> = match filter.status {
            None | Some(ApprovalStatus::PendingApproval) => self
                .pending
                .read()
                .await
                .values()
                .map(|e| ApprovalQueueItem::project(e, now))
                .collect(),
            Some(status) => self
                .store
                .list(&EntryQuery::with_status(status))
                .await?
                .iter()
                .map(|e| ApprovalQueueItem::project(e, now))
                .collect(),
        };
        items.retain(|item| filter.matches(item));
        queue::sort_queue(&mut items);
        Ok(queue::paginate(&items, page, page_size))
    }

    pub async fn get_entry(&self, id: &str) -> Result<DataEntry, CoreError> {
        self.store.get(id).await?.ok_or_else(|| not_found(id))
    }

    /// Normalize an admin-submitted record and store it as a draft.
    ///
    /// Fails with [`CoreError::Conflict`] if an entry with the same id
    /// already exists.
    pub async fn create_draft(&self, new: NewEntry) -> Result<DataEntry, CoreError> {
        let entry = normalizer::normalize(
            RawRecord {
                origin: Origin::Firestore,
                data_type: new.data_type,
                island_id: &new.island_id,
                body: &new.body,
            },
            Utc::now(),
        )?;

        if !self.store.insert(&entry).await? {
            return Err(CoreError::Conflict(format!(
                "Entry '{}' already exists",
                entry.id
            )));
        }

        tracing::info!(
            entry_id = %entry.id,
            island_id = %entry.island_id,
            data_type = %entry.data_type.as_str(),
            warnings = entry.warnings.len(),
            "Draft entry created",
        );
        self.bus.publish(DashboardEvent::EntryIngested {
            entry_id: entry.id.clone(),
            island_id: entry.island_id.clone(),
            at: entry.created_at,
        });
        Ok(entry)
    }

    /// Move a draft (or an entry needing changes) into the queue.
    ///
    /// `actor` may be `None` only for the initial system submission.
    pub async fn submit(&self, id: &str, actor: Option<Actor>) -> Result<DataEntry, CoreError> {
        self.transition(
            id,
            TransitionRequest {
                action: ApprovalAction::Submit,
                actor,
                notes: None,
            },
        )
        .await
    }

    /// Run one transition against the stored entry.
    ///
    /// The queue view is reconciled with the stored state even when the
    /// transition is refused, so an entry changed elsewhere drops out. If
    /// another writer moves the entry between the read and the commit, the
    /// commit is refused with [`CoreError::Conflict`] and nothing is written.
    pub async fn transition(
        &self,
        id: &str,
        request: TransitionRequest,
    ) -> Result<DataEntry, CoreError> {
        let Some(current) = self.store.get(id).await? else {
            self.pending.write().await.remove(id);
            return Err(not_found(id));
        };

        let transition = match approval::apply(&current, &request, Utc::now()) {
            Ok(transition) => transition,
            Err(e) => {
                self.reconcile(&current).await;
                tracing::debug!(entry_id = %id, action = %request.action, error = %e, "Transition refused");
                return Err(e);
            }
        };

        let stored = match self
            .store
            .commit_transition(current.status(), &transition.entry, &transition.audit)
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                self.reconcile(&current).await;
                tracing::debug!(entry_id = %id, action = %request.action, error = %e, "Transition commit refused");
                return Err(e.into());
            }
        };
        self.reconcile(&stored).await;
        self.assembler.upsert_entry(&stored, Utc::now()).await;

        let actor = request
            .actor
            .as_ref()
            .map_or(SYSTEM_USER, |a| a.email.as_str())
            .to_string();
        tracing::info!(
            entry_id = %stored.id,
            from = %current.status(),
            to = %stored.status(),
            actor = %actor,
            "Entry transitioned",
        );
        self.bus.publish(DashboardEvent::EntryTransitioned {
            entry_id: stored.id.clone(),
            island_id: stored.island_id.clone(),
            data_type: stored.data_type,
            from: current.status(),
            to: stored.status(),
            actor,
            at: stored.updated_at,
        });

        Ok(stored)
    }

    /// Apply the same action and notes to every id, independently.
    ///
    /// Duplicate ids are processed once. Results are reported in the
    /// order the ids were given.
    pub async fn batch(
        &self,
        ids: &[EntryId],
        action: ApprovalAction,
        actor: Option<Actor>,
        notes: Option<String>,
    ) -> BatchReport {
        let mut unique: Vec<&EntryId> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }

        let outcomes = join_all(unique.iter().map(|id| {
            self.transition(
                id,
                TransitionRequest {
                    action,
                    actor: actor.clone(),
                    notes: notes.clone(),
                },
            )
        }))
        .await;

        let results: Vec<BatchItemResult> = unique
            .into_iter()
            .zip(outcomes)
            .map(|(id, outcome)| match outcome {
                Ok(entry) => BatchItemResult {
                    id: id.clone(),
                    success: true,
                    status: Some(entry.status()),
                    error: None,
                    code: None,
                },
                Err(e) => BatchItemResult {
                    id: id.clone(),
                    success: false,
                    status: None,
                    code: Some(e.code()),
                    error: Some(e.to_string()),
                },
            })
            .collect();

        let succeeded = results.iter().filter(|r| r.success).count();
        let report = BatchReport {
            action,
            succeeded,
            failed: results.len() - succeeded,
            results,
        };
        if report.is_partial() {
            tracing::warn!(
                action = %action,
                succeeded = report.succeeded,
                failed = report.failed,
                "Batch transition partially failed",
            );
        }
        report
    }

    /// Queue statistics as of `now`.
    pub async fn stats(&self, now: Timestamp) -> Result<QueueStats, CoreError> {
        let pending: Vec<ApprovalQueueItem> = self
            .pending
            .read()
            .await
            .values()
            .map(|e| ApprovalQueueItem::project(e, now))
            .collect();
        let audit = self
            .store
            .list_audit(&AuditQuery {
                since: Some(now - Duration::days(STATS_LOOKBACK_DAYS)),
                ..AuditQuery::default()
            })
            .await?;
        Ok(queue::compute_stats(&pending, &audit, now, self.local_offset))
    }

    /// Read the append-only audit log.
    pub async fn audit_log(&self, query: &AuditQuery) -> Result<Vec<AuditLogEntry>, CoreError> {
        Ok(self.store.list_audit(query).await?)
    }

    // ---- private helpers ----

    /// Bring one queue slot in line with the store.
    ///
    /// The entry is re-read while the queue lock is held, so a reconcile
    /// that runs late can never restore a state that a later commit has
    /// already replaced. `seen` is used only if the store cannot be read.
    async fn reconcile(&self, seen: &DataEntry) {
        let mut pending = self.pending.write().await;
        let latest = match self.store.get(&seen.id).await {
            Ok(latest) => latest,
            Err(e) => {
                tracing::warn!(entry_id = %seen.id, error = %e, "Store read failed during queue reconcile");
                Some(seen.clone())
            }
        };
        match latest {
            Some(entry) if entry.is_active && entry.status() == ApprovalStatus::PendingApproval => {
                pending.insert(entry.id.clone(), entry);
            }
            _ => {
                pending.remove(&seen.id);
            }
        }
    }
}

fn not_found(id: &str) -> CoreError {
    CoreError::NotFound {
        entity: "DataEntry",
        id: id.to_string(),
    }
}
