//! The push-update channel.
//!
//! [`LiveUpdateChannel`] owns the single WebSocket connection to the
//! scraper and one consumer task. The connection task cycles
//! `Disconnected -> Connecting -> Connected -> Disconnected`, subscribing
//! to the full island set on every connect. Validated patches go through
//! a bounded mailbox to the consumer, which is the only writer of push
//! patches into the [`IslandViewAssembler`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::SinkExt;
use islandboard_core::assembler::IslandViewAssembler;
use islandboard_core::island;
use islandboard_core::normalizer::LotterySnapshot;
use islandboard_events::{ConnectionState, DashboardEvent, EventBus};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::LiveClient;
use crate::processor::{process_messages, StreamEnd};
use crate::reconnect::{wait_before_reconnect, ReconnectConfig};

/// Patches buffered between the socket reader and the consumer.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 64;

/// Settings for [`LiveUpdateChannel::start`].
#[derive(Debug, Clone)]
pub struct LiveConfig {
    pub ws_url: String,
    pub reconnect: ReconnectConfig,
    pub mailbox_capacity: usize,
    /// Islands subscribed on every connect. Defaults to the whole registry.
    pub islands: Vec<String>,
}

impl LiveConfig {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            reconnect: ReconnectConfig::default(),
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            islands: island::island_ids().map(str::to_string).collect(),
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect = ReconnectConfig { delay };
        self
    }
}

/// Errors from managing the channel's tasks.
#[derive(Debug, thiserror::Error)]
pub enum LiveChannelError {
    /// A task did not stop within the shutdown timeout and was aborted.
    #[error("Live update {task} task did not stop within {timeout:?}")]
    ShutdownTimeout {
        task: &'static str,
        timeout: Duration,
    },
}

/// Handle to the running push-update listener.
///
/// Created once per session via [`LiveUpdateChannel::start`]. Dropping the
/// handle cancels both tasks; [`LiveUpdateChannel::shutdown`] also waits
/// for them to exit.
pub struct LiveUpdateChannel {
    state: Arc<StateReporter>,
    islands: Vec<String>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
}

impl LiveUpdateChannel {
    /// Spawn the connection task and the patch consumer.
    ///
    /// Must be called from within a tokio runtime. Returns immediately;
    /// the first connect attempt happens in the background.
    pub fn start(
        config: LiveConfig,
        assembler: Arc<IslandViewAssembler>,
        bus: Arc<EventBus>,
    ) -> Arc<Self> {
        let cancel = CancellationToken::new();
        let state = Arc::new(StateReporter::new(Arc::clone(&bus)));
        let (mailbox_tx, mailbox_rx) = mpsc::channel(config.mailbox_capacity.max(1));

        let client = LiveClient::new(config.ws_url.clone(), config.islands.clone());
        let connection = {
            let state = Arc::clone(&state);
            let cancel = cancel.clone();
            let reconnect = config.reconnect;
            tokio::spawn(async move {
                tracing::info!(url = %client.ws_url(), "Starting live update connection task");
                run_connection_loop(&client, &reconnect, &mailbox_tx, &state, &cancel).await;
                tracing::info!("Live update connection task exited");
            })
        };

        let consumer = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                run_patch_consumer(mailbox_rx, &assembler, &bus, &cancel).await;
                tracing::debug!("Live update consumer exited");
            })
        };

        Arc::new(Self {
            state,
            islands: config.islands,
            cancel,
            tasks: Mutex::new(vec![("connection", connection), ("consumer", consumer)]),
        })
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.tx.borrow()
    }

    /// Watch connection-state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.tx.subscribe()
    }

    pub fn islands(&self) -> &[String] {
        &self.islands
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel both tasks and wait up to `timeout` for each to exit.
    ///
    /// A task that does not stop in time is aborted and reported.
    /// Calling this more than once is harmless.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), LiveChannelError> {
        tracing::info!("Shutting down live update channel");
        self.cancel.cancel();

        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        let mut result = Ok(());
        for (task, mut handle) in tasks {
            if tokio::time::timeout(timeout, &mut handle).await.is_err() {
                tracing::warn!(task, "Live update task did not stop in time, aborting");
                handle.abort();
                result = Err(LiveChannelError::ShutdownTimeout { task, timeout });
            }
        }

        self.state.set(ConnectionState::Disconnected);
        tracing::info!("Live update channel shut down");
        result
    }
}

impl Drop for LiveUpdateChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ---- state reporting ----

/// Holds the current connection state and announces changes on the bus.
struct StateReporter {
    tx: watch::Sender<ConnectionState>,
    bus: Arc<EventBus>,
}

impl StateReporter {
    fn new(bus: Arc<EventBus>) -> Self {
        let (tx, _) = watch::channel(ConnectionState::Disconnected);
        Self { tx, bus }
    }

    fn set(&self, state: ConnectionState) {
        if self.tx.send_replace(state) != state {
            tracing::debug!(state = %state, "Live connection state changed");
            self.bus.publish(DashboardEvent::ConnectionStateChanged {
                state,
                at: Utc::now(),
            });
        }
    }
}

// ---- tasks ----

/// Connect, process until the socket drops, wait one back-off period,
/// repeat. Runs until cancelled or the consumer is gone.
async fn run_connection_loop(
    client: &LiveClient,
    reconnect: &ReconnectConfig,
    mailbox: &mpsc::Sender<LotterySnapshot>,
    state: &StateReporter,
    cancel: &CancellationToken,
) {
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        state.set(ConnectionState::Connecting);
        tracing::info!(attempt, "Connecting to live updates");

        let connected = tokio::select! {
            _ = cancel.cancelled() => break,
            result = client.connect() => result,
        };

        match connected {
            Ok(conn) => {
                attempt = 0;
                state.set(ConnectionState::Connected);

                let mut ws_stream = conn.ws_stream;
                let end = process_messages(&mut ws_stream, mailbox, cancel).await;
                if end != StreamEnd::Disconnected {
                    // Best-effort close handshake; the peer may already be gone.
                    let _ = SinkExt::close(&mut ws_stream).await;
                }
                state.set(ConnectionState::Disconnected);

                match end {
                    StreamEnd::Cancelled => break,
                    StreamEnd::MailboxClosed => {
                        tracing::warn!("Patch consumer is gone, stopping live updates");
                        break;
                    }
                    StreamEnd::Disconnected => {
                        tracing::info!(
                            delay_ms = reconnect.delay.as_millis() as u64,
                            "Live connection lost, reconnecting after delay",
                        );
                    }
                }
            }
            Err(e) => {
                state.set(ConnectionState::Disconnected);
                tracing::warn!(
                    attempt,
                    error = %e,
                    delay_ms = reconnect.delay.as_millis() as u64,
                    "Live connect attempt failed",
                );
            }
        }

        if !wait_before_reconnect(reconnect, cancel).await {
            break;
        }
    }

    state.set(ConnectionState::Disconnected);
}

/// Drain the mailbox into the assembler, one patch at a time.
async fn run_patch_consumer(
    mut mailbox: mpsc::Receiver<LotterySnapshot>,
    assembler: &IslandViewAssembler,
    bus: &EventBus,
    cancel: &CancellationToken,
) {
    loop {
        let snapshot = tokio::select! {
            // Pending patches are dropped: nothing may mutate the view
            // after teardown.
            _ = cancel.cancelled() => return,
            next = mailbox.recv() => match next {
                Some(snapshot) => snapshot,
                None => return,
            },
        };

        let island_id = snapshot.island_id.clone();
        let now = Utc::now();
        if assembler.apply_patch(snapshot, now).await {
            let version = assembler.snapshot().await.version;
            tracing::info!(island_id = %island_id, version, "Applied live patch");
            bus.publish(DashboardEvent::IslandPatched {
                island_id,
                version,
                at: now,
            });
        } else {
            tracing::debug!(island_id = %island_id, "Live patch unchanged or shadowed");
        }
    }
}
