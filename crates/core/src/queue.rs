//! Review-queue projection, ordering, filtering, pagination and statistics.
//!
//! Everything here is a pure function of entries, audit records and a
//! clock; the live queue itself is held by the pipeline crate.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::audit::{AuditAction, AuditLogEntry};
use crate::entry::{ApprovalLevel, ApprovalStatus, DataEntry, DataSource, DataType};
use crate::types::{EntryId, IslandId, Timestamp};

/// Pending items at least this old are escalated to [`Priority::Urgent`].
pub const URGENT_AFTER_HOURS: i64 = 24;

/// Window for the average approval time and per-admin counts.
pub const STATS_WINDOW_DAYS: i64 = 7;

/// Default page size when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Upper bound on page size.
pub const MAX_PAGE_SIZE: usize = 100;

/* --------------------------------------------------------------------------
Projection
-------------------------------------------------------------------------- */

/// Review urgency. Declaration order is queue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Urgent,
    High,
    Medium,
    Low,
}

/// Read-optimized view of an entry awaiting review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalQueueItem {
    pub id: EntryId,
    pub data_type: DataType,
    pub island: IslandId,
    pub title: String,
    pub summary: String,
    pub source: DataSource,
    pub status: ApprovalStatus,
    pub submitted_at: Timestamp,
    pub submitted_by: Option<String>,
    pub priority: Priority,
    /// Minutes.
    pub estimated_review_time: u32,
    /// The entry's payload as stored.
    pub data_preview: serde_json::Value,
    pub requires_special_permission: bool,
}

impl ApprovalQueueItem {
    /// Project `entry` as seen at `now`.
    pub fn project(entry: &DataEntry, now: Timestamp) -> Self {
        let submitted_at = entry.submitted_at.unwrap_or(entry.updated_at);
        let special = entry.approval.approval_level == ApprovalLevel::SuperAdmin;
        Self {
            id: entry.id.clone(),
            data_type: entry.data_type,
            island: entry.island_id.clone(),
            title: entry.payload.title(),
            summary: entry.payload.summary(),
            source: entry.source,
            status: entry.status(),
            submitted_at,
            submitted_by: entry.submitted_by.clone(),
            priority: priority_for(entry.data_type, submitted_at, now),
            estimated_review_time: estimated_review_minutes(entry.data_type, special),
            data_preview: serde_json::to_value(&entry.payload).unwrap_or_default(),
            requires_special_permission: special,
        }
    }
}

/// Priority from data type, escalated to urgent once the item is stale.
pub fn priority_for(data_type: DataType, submitted_at: Timestamp, now: Timestamp) -> Priority {
    if now - submitted_at >= Duration::hours(URGENT_AFTER_HOURS) {
        return Priority::Urgent;
    }
    match data_type {
        DataType::Lottery => Priority::High,
        DataType::Commodity | DataType::Hotel => Priority::Medium,
        DataType::Event => Priority::Low,
    }
}

pub fn estimated_review_minutes(data_type: DataType, special_permission: bool) -> u32 {
    let base = match data_type {
        DataType::Lottery => 2,
        DataType::Commodity => 3,
        DataType::Hotel => 5,
        DataType::Event => 8,
    };
    if special_permission {
        base + 5
    } else {
        base
    }
}

/* --------------------------------------------------------------------------
Ordering
-------------------------------------------------------------------------- */

/// Queue order: priority, then oldest submission first, then id.
pub fn queue_order(a: &ApprovalQueueItem, b: &ApprovalQueueItem) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then(a.submitted_at.cmp(&b.submitted_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort `items` into queue order. Deterministic for any input order.
pub fn sort_queue(items: &mut [ApprovalQueueItem]) {
    items.sort_by(queue_order);
}

/* --------------------------------------------------------------------------
Filtering and pagination
-------------------------------------------------------------------------- */

/// Review-queue filter. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueueFilter {
    pub status: Option<ApprovalStatus>,
    pub data_type: Option<DataType>,
    pub island: Option<IslandId>,
    /// Case-insensitive substring of the title or id.
    pub search: Option<String>,
}

impl QueueFilter {
    pub fn matches(&self, item: &ApprovalQueueItem) -> bool {
        if self.status.is_some_and(|s| s != item.status) {
            return false;
        }
        if self.data_type.is_some_and(|t| t != item.data_type) {
            return false;
        }
        if let Some(island) = &self.island {
            if !island.eq_ignore_ascii_case(&item.island) {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                item.title.to_lowercase().contains(&term) || item.id.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}

/// One zero-indexed page of results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// Slice `items` into page `page` of size `page_size` (clamped to
/// `1..=MAX_PAGE_SIZE`). Pages past the end are empty.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    let total = items.len();
    let start = page.saturating_mul(page_size).min(total);
    let end = start.saturating_add(page_size).min(total);
    Page {
        items: items[start..end].to_vec(),
        page,
        page_size,
        total,
        total_pages: total.div_ceil(page_size),
    }
}

/* --------------------------------------------------------------------------
Statistics
-------------------------------------------------------------------------- */

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueueStats {
    pub pending_count: usize,
    pub approved_today: usize,
    pub rejected_today: usize,
    /// Mean minutes from submission to review over the stats window.
    pub average_approval_time_minutes: Option<f64>,
    /// Age of the oldest pending item, in minutes.
    pub oldest_pending_minutes: Option<i64>,
    pub by_data_type: BTreeMap<String, usize>,
    pub by_island: BTreeMap<String, usize>,
    /// Review decisions per admin email over the stats window.
    pub by_admin: BTreeMap<String, usize>,
}

/// Compute queue statistics.
///
/// `pending` are the current queue items; `audit` is the audit log (any
/// order). "Today" is the calendar day of `now` in `local`.
pub fn compute_stats(
    pending: &[ApprovalQueueItem],
    audit: &[AuditLogEntry],
    now: Timestamp,
    local: FixedOffset,
) -> QueueStats {
    let mut stats = QueueStats {
        pending_count: pending.len(),
        ..QueueStats::default()
    };

    for item in pending {
        *stats
            .by_data_type
            .entry(item.data_type.as_str().to_string())
            .or_default() += 1;
        *stats.by_island.entry(item.island.clone()).or_default() += 1;
    }
    stats.oldest_pending_minutes = pending
        .iter()
        .map(|item| (now - item.submitted_at).num_minutes())
        .max();

    let today = now.with_timezone(&local).date_naive();
    let window_start = now - Duration::days(STATS_WINDOW_DAYS);

    // Submissions per resource, oldest first, to pair reviews with the
    // submission they closed.
    let mut submissions: HashMap<&str, Vec<Timestamp>> = HashMap::new();
    for record in audit.iter().filter(|r| r.action == AuditAction::Submitted) {
        submissions
            .entry(record.resource_id.as_str())
            .or_default()
            .push(record.timestamp);
    }
    for times in submissions.values_mut() {
        times.sort_unstable();
    }

    let mut durations = Vec::new();
    for record in audit.iter().filter(|r| r.action.is_review()) {
        if record.timestamp.with_timezone(&local).date_naive() == today {
            match record.action {
                AuditAction::Approved => stats.approved_today += 1,
                AuditAction::Rejected => stats.rejected_today += 1,
                _ => {}
            }
        }

        if record.timestamp < window_start || record.timestamp > now {
            continue;
        }
        *stats.by_admin.entry(record.user_email.clone()).or_default() += 1;

        let submitted = submissions
            .get(record.resource_id.as_str())
            .and_then(|times| times.iter().rev().find(|t| **t <= record.timestamp));
        if let Some(submitted) = submitted {
            durations.push((record.timestamp - *submitted).num_seconds() as f64 / 60.0);
        }
    }

    if !durations.is_empty() {
        stats.average_approval_time_minutes =
            Some(durations.iter().sum::<f64>() / durations.len() as f64);
    }

    stats
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
