//! Approval state machine for data entries.
//!
//! Lawful edges:
//! - `draft`            -> `pending_approval` (submit)
//! - `pending_approval` -> `approved` | `rejected` | `requires_changes`
//! - `requires_changes` -> `pending_approval` (resubmit)
//! - `approved`         -> `published`
//! - `published`        -> `archived`
//!
//! `archived` is terminal, and so is `rejected`: a rejected entry comes
//! back only as a brand-new draft. Transitions are pure: [`apply`] returns
//! the next entry plus exactly one audit record and never mutates its
//! input, so a refused transition leaves state untouched.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::audit::{AuditAction, AuditLogEntry, SYSTEM_USER};
use crate::entry::{ApprovalLevel, ApprovalStatus, DataEntry};
use crate::error::CoreError;
use crate::types::{IslandId, Timestamp};

// ---------------------------------------------------------------------------
// Actions and actors
// ---------------------------------------------------------------------------

/// An operation an admin (or the system, for submission) may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    /// `draft` or `requires_changes` -> `pending_approval`.
    Submit,
    Approve,
    Reject,
    RequestChanges,
    Publish,
    Archive,
}

impl ApprovalAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::RequestChanges => "request_changes",
            Self::Publish => "publish",
            Self::Archive => "archive",
        }
    }

    /// Whether this action must carry a non-empty reason.
    pub fn requires_reason(self) -> bool {
        matches!(self, Self::Reject | Self::RequestChanges)
    }

    fn audit_action(self) -> AuditAction {
        match self {
            Self::Submit => AuditAction::Submitted,
            Self::Approve => AuditAction::Approved,
            Self::Reject => AuditAction::Rejected,
            Self::RequestChanges => AuditAction::RequestedChanges,
            Self::Publish => AuditAction::Published,
            Self::Archive => AuditAction::Archived,
        }
    }
}

impl fmt::Display for ApprovalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalAction {
    type Err = CoreError;

    /// Accepts snake_case and the kebab-case used in URLs.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('-', "_").as_str() {
            "submit" => Ok(Self::Submit),
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            "request_changes" => Ok(Self::RequestChanges),
            "publish" => Ok(Self::Publish),
            "archive" => Ok(Self::Archive),
            other => Err(CoreError::validation(
                "action",
                format!(
                    "Unknown action '{other}'. Must be one of: submit, approve, reject, \
                     request_changes, publish, archive"
                ),
            )),
        }
    }
}

/// The admin performing a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub email: String,
    pub level: ApprovalLevel,
    /// Islands an island admin may act on. Ignored for super admins.
    #[serde(default)]
    pub islands: Vec<IslandId>,
    #[serde(default)]
    pub ip_address: Option<String>,
}

impl Actor {
    /// Whether this actor may act on entries of `island_id`.
    pub fn can_act_on(&self, island_id: &str) -> bool {
        self.level == ApprovalLevel::SuperAdmin
            || self.islands.iter().any(|i| i.eq_ignore_ascii_case(island_id))
    }
}

/// A requested transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRequest {
    pub action: ApprovalAction,
    pub actor: Option<Actor>,
    /// Reason for reject / requested changes; optional notes otherwise.
    pub notes: Option<String>,
}

/// The result of a lawful transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub entry: DataEntry,
    pub audit: AuditLogEntry,
}

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

/// Actions that are lawful from `from`.
pub fn valid_actions(from: ApprovalStatus) -> &'static [ApprovalAction] {
    use ApprovalAction::*;
    match from {
        ApprovalStatus::Draft => &[Submit],
        ApprovalStatus::PendingApproval => &[Approve, Reject, RequestChanges],
        ApprovalStatus::RequiresChanges => &[Submit],
        ApprovalStatus::Approved => &[Publish],
        ApprovalStatus::Published => &[Archive],
        ApprovalStatus::Rejected | ApprovalStatus::Archived => &[],
    }
}

/// Status reached by applying `action` in `from`, if lawful.
pub fn target(from: ApprovalStatus, action: ApprovalAction) -> Option<ApprovalStatus> {
    if !valid_actions(from).contains(&action) {
        return None;
    }
    Some(match action {
        ApprovalAction::Submit => ApprovalStatus::PendingApproval,
        ApprovalAction::Approve => ApprovalStatus::Approved,
        ApprovalAction::Reject => ApprovalStatus::Rejected,
        ApprovalAction::RequestChanges => ApprovalStatus::RequiresChanges,
        ApprovalAction::Publish => ApprovalStatus::Published,
        ApprovalAction::Archive => ApprovalStatus::Archived,
    })
}

// ---------------------------------------------------------------------------
// Apply
// ---------------------------------------------------------------------------

/// Validate `request` against `entry` and compute the next state.
///
/// Fails with [`CoreError::InvalidTransition`] for unlawful edges, a
/// missing actor, or a missing reason; with [`CoreError::Forbidden`] when
/// the actor's level or island scope does not cover the entry.
pub fn apply(
    entry: &DataEntry,
    request: &TransitionRequest,
    now: Timestamp,
) -> Result<Transition, CoreError> {
    let from = entry.status();
    let action = request.action;
    let refuse = |reason: String| CoreError::InvalidTransition {
        from,
        action: action.as_str().to_string(),
        reason,
    };

    if !entry.is_active {
        return Err(refuse("entry is inactive".to_string()));
    }

    let to = target(from, action).ok_or_else(|| {
        let allowed: Vec<&str> = valid_actions(from).iter().map(|a| a.as_str()).collect();
        refuse(format!("not allowed; allowed actions: {allowed:?}"))
    })?;

    let initial_submit = from == ApprovalStatus::Draft && action == ApprovalAction::Submit;
    if request.actor.is_none() && !initial_submit {
        return Err(refuse("an acting admin is required".to_string()));
    }

    let notes = request
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());
    if action.requires_reason() && notes.is_none() {
        return Err(refuse("a non-empty reason is required".to_string()));
    }

    if let Some(actor) = &request.actor {
        authorize(entry, actor)?;
    }

    let (user_id, email) = match &request.actor {
        Some(actor) => (actor.user_id.clone(), actor.email.clone()),
        None => (SYSTEM_USER.to_string(), SYSTEM_USER.to_string()),
    };

    let mut next = entry.clone();
    next.approval.status = to;
    next.updated_at = now;
    if to.is_reviewed() {
        next.approval.reviewed_at = Some(now);
        next.approval.reviewed_by = Some(email.clone());
    } else {
        next.approval.reviewed_at = None;
        next.approval.reviewed_by = None;
    }
    next.approval.change_requests = match to {
        ApprovalStatus::RequiresChanges => notes.map(str::to_string),
        _ => None,
    };
    if to == ApprovalStatus::PendingApproval {
        next.submitted_at = Some(now);
        next.submitted_by = Some(email.clone());
    }

    let audit = AuditLogEntry {
        id: uuid::Uuid::new_v4().to_string(),
        user_id,
        user_email: email,
        action: action.audit_action(),
        resource_type: entry.data_type.as_str().to_string(),
        resource_id: entry.id.clone(),
        details: serde_json::json!({
            "from": from,
            "to": to,
            "island_id": entry.island_id,
            "notes": notes,
        }),
        timestamp: now,
        ip_address: request.actor.as_ref().and_then(|a| a.ip_address.clone()),
    };

    Ok(Transition { entry: next, audit })
}

fn authorize(entry: &DataEntry, actor: &Actor) -> Result<(), CoreError> {
    if entry.approval.approval_level == ApprovalLevel::SuperAdmin
        && actor.level != ApprovalLevel::SuperAdmin
    {
        return Err(CoreError::Forbidden(format!(
            "Entry '{}' requires a super admin",
            entry.id
        )));
    }
    if !actor.can_act_on(&entry.island_id) {
        return Err(CoreError::Forbidden(format!(
            "{} may not act on island '{}'",
            actor.email, entry.island_id
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
