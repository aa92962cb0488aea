//! Reconnection timing for the push-update link.
//!
//! The link reconnects after a fixed delay. Each disconnect arms exactly
//! one timer; a connect attempt only ever starts after that timer fires,
//! so attempts never overlap.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Delay before the next reconnect attempt after any disconnect.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectConfig {
    pub delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Wait out the reconnect delay.
///
/// Returns `true` when the timer fired and the caller should attempt to
/// connect, or `false` if `cancel` was triggered first.
pub async fn wait_before_reconnect(config: &ReconnectConfig, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(config.delay) => true,
    }
}
