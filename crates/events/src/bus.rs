//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`DashboardEvent`]s. It is
//! shared via `Arc<EventBus>` across the application.

use std::fmt;

use chrono::{DateTime, Utc};
use islandboard_core::entry::{ApprovalStatus, DataType};
use serde::Serialize;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// ConnectionState
// ---------------------------------------------------------------------------

/// State of the live-update WebSocket link.
///
/// Cycles `Disconnected -> Connecting -> Connected -> Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// DashboardEvent
// ---------------------------------------------------------------------------

/// Something that changed on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardEvent {
    /// An entry moved along its approval lifecycle.
    EntryTransitioned {
        entry_id: String,
        island_id: String,
        data_type: DataType,
        from: ApprovalStatus,
        to: ApprovalStatus,
        actor: String,
        at: DateTime<Utc>,
    },
    /// A scraped record entered the store for the first time.
    EntryIngested {
        entry_id: String,
        island_id: String,
        at: DateTime<Utc>,
    },
    /// A push update replaced one island's unreviewed data.
    IslandPatched {
        island_id: String,
        version: u64,
        at: DateTime<Utc>,
    },
    /// A full refetch swapped the whole island map.
    ViewRefreshed {
        version: u64,
        backend_available: bool,
        at: DateTime<Utc>,
    },
    ConnectionStateChanged {
        state: ConnectionState,
        at: DateTime<Utc>,
    },
}

impl DashboardEvent {
    /// Dot-separated event name, e.g. `"entry.transitioned"`.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::EntryTransitioned { .. } => "entry.transitioned",
            Self::EntryIngested { .. } => "entry.ingested",
            Self::IslandPatched { .. } => "island.patched",
            Self::ViewRefreshed { .. } => "view.refreshed",
            Self::ConnectionStateChanged { .. } => "live.connection_state_changed",
        }
    }

    /// Island the event concerns, if it concerns exactly one.
    pub fn island_id(&self) -> Option<&str> {
        match self {
            Self::EntryTransitioned { island_id, .. }
            | Self::EntryIngested { island_id, .. }
            | Self::IslandPatched { island_id, .. } => Some(island_id),
            Self::ViewRefreshed { .. } | Self::ConnectionStateChanged { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`DashboardEvent`].
///
/// # Usage
///
/// ```rust
/// use islandboard_events::bus::{ConnectionState, DashboardEvent, EventBus};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(DashboardEvent::ConnectionStateChanged {
///     state: ConnectionState::Connecting,
///     at: chrono::Utc::now(),
/// });
/// ```
pub struct EventBus {
    sender: broadcast::Sender<DashboardEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: DashboardEvent) {
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn patched(island: &str) -> DashboardEvent {
        DashboardEvent::IslandPatched {
            island_id: island.into(),
            version: 3,
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn every_subscriber_receives_each_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(patched("jamaica"));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(e1, e2);
        assert_eq!(e1.event_type(), "island.patched");
        assert_eq!(e1.island_id(), Some("jamaica"));
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(patched("grenada"));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = DashboardEvent::EntryTransitioned {
            entry_id: "e-1".into(),
            island_id: "barbados".into(),
            data_type: DataType::Hotel,
            from: ApprovalStatus::PendingApproval,
            to: ApprovalStatus::Approved,
            actor: "rev@example.com".into(),
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "entry_transitioned");
        assert_eq!(json["to"], "approved");
    }

    #[tokio::test]
    async fn slow_receivers_observe_lag() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for island in ["jamaica", "trinidad", "barbados"] {
            bus.publish(patched(island));
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
    }
}
