//! Full refetch of the island view.
//!
//! One refresh pulls the scraper summary, ingests every new scraped game
//! into the approval workflow, reads displayable entries from the store
//! and swaps a freshly assembled island map into the assembler. A failed
//! scraper call is not an error: the view degrades to store data, then
//! to mock data when that is enabled.

use std::sync::Arc;

use chrono::Utc;
use islandboard_core::assembler::{IslandViewAssembler, RefreshInput};
use islandboard_core::normalizer::{self, LotterySnapshot, Origin};
use islandboard_core::types::Timestamp;
use islandboard_db::EntryQuery;
use islandboard_events::{DashboardEvent, EventBus};
use islandboard_live::ScraperApi;
use serde::Serialize;

use crate::approvals::ApprovalQueue;

/// Summary of one refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshReport {
    pub version: u64,
    pub refreshed_at: Timestamp,
    pub backend_available: bool,
    pub store_available: bool,
    /// Islands whose scraper envelope was accepted.
    pub islands_scraped: usize,
    /// Islands whose scraper envelope failed validation.
    pub rejected_islands: Vec<String>,
    /// Scraped games seen for the first time and sent for review.
    pub ingested: usize,
    pub mock_islands: usize,
}

/// Performs full refreshes. Cheap to share behind an `Arc`.
pub struct RefreshService {
    scraper: ScraperApi,
    queue: Arc<ApprovalQueue>,
    assembler: Arc<IslandViewAssembler>,
    bus: Arc<EventBus>,
}

impl RefreshService {
    pub fn new(
        scraper: ScraperApi,
        queue: Arc<ApprovalQueue>,
        assembler: Arc<IslandViewAssembler>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            scraper,
            queue,
            assembler,
            bus,
        }
    }

    pub fn scraper(&self) -> &ScraperApi {
        &self.scraper
    }

    /// Refetch everything and atomically replace the island view.
    pub async fn refresh(&self) -> RefreshReport {
        let now = Utc::now();

        let (scraped, rejected_islands, backend_available) = self.fetch_scraped(now).await;
        let ingested = self.ingest(&scraped).await;

        let listed_at = Utc::now();
        let (approved, store_available) =
            match self.queue.store().list(&EntryQuery::displayable()).await {
                Ok(entries) => (entries, true),
                Err(e) => {
                    tracing::warn!(error = %e, "Store unavailable during refresh");
                    (Vec::new(), false)
                }
            };
        if store_available {
            if let Err(e) = self.queue.load().await {
                tracing::warn!(error = %e, "Failed to reload approval queue");
            }
        }

        let islands_scraped = scraped.len();
        let map = self
            .assembler
            .refresh(
                RefreshInput {
                    approved,
                    scraped,
                    backend_available,
                    listed_at: Some(listed_at),
                },
                now,
            )
            .await;
        let mock_islands = map.islands.values().filter(|r| r.is_mock()).count();

        self.bus.publish(DashboardEvent::ViewRefreshed {
            version: map.version,
            backend_available,
            at: now,
        });
        tracing::info!(
            version = map.version,
            backend_available,
            store_available,
            islands_scraped,
            ingested,
            mock_islands,
            "Island view refreshed",
        );

        RefreshReport {
            version: map.version,
            refreshed_at: now,
            backend_available,
            store_available,
            islands_scraped,
            rejected_islands,
            ingested,
            mock_islands,
        }
    }

    // ---- private helpers ----

    /// Scraper snapshots that passed validation, the islands that did not,
    /// and whether the scraper answered at all.
    async fn fetch_scraped(&self, now: Timestamp) -> (Vec<LotterySnapshot>, Vec<String>, bool) {
        let envelopes = match self.scraper.summary_all().await {
            Ok(envelopes) => envelopes,
            Err(e) => {
                tracing::warn!(
                    base_url = %self.scraper.base_url(),
                    error = %e,
                    "Scraper unavailable, falling back",
                );
                return (Vec::new(), Vec::new(), false);
            }
        };

        let mut snapshots = Vec::with_capacity(envelopes.len());
        let mut rejected = Vec::new();
        for (island_id, envelope) in envelopes {
            match normalizer::normalize_lottery_envelope(Origin::Scraper, &island_id, &envelope, now)
            {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => {
                    tracing::warn!(island_id = %island_id, error = %e, "Rejected scraper envelope");
                    rejected.push(island_id);
                }
            }
        }
        (snapshots, rejected, true)
    }

    /// Insert unseen scraped games as drafts and submit each one.
    ///
    /// Entry ids are derived from the draw, so a game already in the store
    /// is never ingested twice.
    async fn ingest(&self, snapshots: &[LotterySnapshot]) -> usize {
        let store = self.queue.store();
        let mut ingested = 0;

        'snapshots: for snapshot in snapshots {
            for entry in &snapshot.entries {
                match store.insert(entry).await {
                    Ok(false) => {}
                    Ok(true) => {
                        self.bus.publish(DashboardEvent::EntryIngested {
                            entry_id: entry.id.clone(),
                            island_id: entry.island_id.clone(),
                            at: entry.created_at,
                        });
                        match self.queue.submit(&entry.id, None).await {
                            Ok(_) => ingested += 1,
                            Err(e) => {
                                tracing::warn!(entry_id = %entry.id, error = %e, "Failed to submit scraped entry");
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Store unavailable, skipping ingestion");
                        break 'snapshots;
                    }
                }
            }
        }

        if ingested > 0 {
            tracing::info!(ingested, "Scraped entries sent for review");
        }
        ingested
    }
}
