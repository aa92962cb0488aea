//! Periodic full refetch of the island view.
//!
//! The first tick fires one full interval after start; the binary runs
//! the initial refresh itself before serving requests.

use std::sync::Arc;
use std::time::Duration;

use islandboard_pipeline::RefreshService;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Run the auto-refresh loop until `cancel` is triggered.
pub async fn run(refresher: Arc<RefreshService>, period: Duration, cancel: CancellationToken) {
    tracing::info!(interval_ms = period.as_millis() as u64, "Auto refresh started");

    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Auto refresh stopping");
                break;
            }
            _ = interval.tick() => {
                let report = refresher.refresh().await;
                if report.backend_available {
                    tracing::debug!(version = report.version, "Auto refresh: view updated");
                } else {
                    tracing::warn!(version = report.version, "Auto refresh: scraper unreachable");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, Utc};
    use islandboard_core::assembler::IslandViewAssembler;
    use islandboard_db::MemoryStore;
    use islandboard_events::{DashboardEvent, EventBus};
    use islandboard_live::ScraperApi;
    use islandboard_pipeline::ApprovalQueue;

    use super::*;

    fn refresher(bus: Arc<EventBus>) -> Arc<RefreshService> {
        let assembler = Arc::new(IslandViewAssembler::new(true, Utc::now()));
        let queue = Arc::new(ApprovalQueue::new(
            Arc::new(MemoryStore::new()),
            Arc::clone(&assembler),
            Arc::clone(&bus),
            FixedOffset::east_opt(0).unwrap(),
        ));
        let scraper = ScraperApi::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        Arc::new(RefreshService::new(scraper, queue, assembler, bus))
    }

    #[tokio::test]
    async fn refreshes_on_each_tick_until_cancelled() {
        let bus = Arc::new(EventBus::default());
        let mut events = bus.subscribe();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            refresher(Arc::clone(&bus)),
            Duration::from_millis(50),
            cancel.clone(),
        ));

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            event,
            DashboardEvent::ViewRefreshed { backend_available: false, .. }
        ));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_before_first_tick_never_refreshes() {
        let bus = Arc::new(EventBus::default());
        let mut events = bus.subscribe();
        let cancel = CancellationToken::new();
        cancel.cancel();

        run(refresher(Arc::clone(&bus)), Duration::from_secs(3600), cancel).await;

        assert!(events.try_recv().is_err());
    }
}
