use std::sync::Arc;

use chrono::Utc;
use islandboard_core::assembler::IslandViewAssembler;
use islandboard_db::{EntryStore, PreferenceStore};
use islandboard_events::EventBus;
use islandboard_live::{LiveUpdateChannel, ScraperApi, ScraperApiError};
use islandboard_pipeline::{ApprovalQueue, RefreshService};

use crate::config::{DashboardConfig, ServerConfig};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// One instance per running dashboard session. Cheaply cloneable: every
/// field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (bind address, CORS, timeouts).
    pub config: Arc<ServerConfig>,
    /// Scraper endpoints, refresh cadence and mock fallback.
    pub dashboard: Arc<DashboardConfig>,
    /// Persisted entries and the audit log.
    pub store: Arc<dyn EntryStore>,
    /// Current island view.
    pub assembler: Arc<IslandViewAssembler>,
    /// Live review queue.
    pub queue: Arc<ApprovalQueue>,
    /// Full refetch of scraper and store data.
    pub refresher: Arc<RefreshService>,
    /// Push-update listener; `None` until started (and in tests).
    pub live: Option<Arc<LiveUpdateChannel>>,
    /// Selected-island preference on disk.
    pub preferences: Arc<PreferenceStore>,
    /// In-process event bus.
    pub event_bus: Arc<EventBus>,
}

impl AppState {
    /// Wire the session's services around `store`.
    ///
    /// Does not touch the network; the first refresh and the live channel
    /// are started by the caller.
    pub fn new(
        config: ServerConfig,
        dashboard: DashboardConfig,
        store: Arc<dyn EntryStore>,
    ) -> Result<Self, ScraperApiError> {
        let event_bus = Arc::new(EventBus::default());
        let assembler = Arc::new(IslandViewAssembler::new(
            dashboard.mock_data_enabled,
            Utc::now(),
        ));
        let queue = Arc::new(ApprovalQueue::new(
            Arc::clone(&store),
            Arc::clone(&assembler),
            Arc::clone(&event_bus),
            dashboard.local_offset,
        ));
        let scraper = ScraperApi::new(dashboard.api_base_url.clone(), dashboard.request_timeout)?;
        let refresher = Arc::new(RefreshService::new(
            scraper,
            Arc::clone(&queue),
            Arc::clone(&assembler),
            Arc::clone(&event_bus),
        ));
        let preferences = Arc::new(PreferenceStore::new(dashboard.preferences_path.clone()));

        Ok(Self {
            config: Arc::new(config),
            dashboard: Arc::new(dashboard),
            store,
            assembler,
            queue,
            refresher,
            live: None,
            preferences,
            event_bus,
        })
    }

    /// Attach a running live channel.
    pub fn with_live(mut self, live: Arc<LiveUpdateChannel>) -> Self {
        self.live = Some(live);
        self
    }

    pub fn scraper(&self) -> &ScraperApi {
        self.refresher.scraper()
    }
}
