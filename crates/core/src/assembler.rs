//! IslandViewAssembler: the single serialization point for the island view.
//!
//! Three layers feed each island, highest precedence first:
//!
//! 1. approved or published lottery entries from the store,
//! 2. the unreviewed layer (last scraper snapshot, overwritten by pushes),
//! 3. deterministic mock data, only when enabled and nothing real exists.
//!
//! An island with none of these is exposed as empty. Readers get an
//! `Arc<IslandMap>` that is never mutated; writers build a new map and
//! swap the reference under the write lock, so no reader observes a mix of
//! old and new islands.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::entry::{DataEntry, DataType};
use crate::island::{self, Island};
use crate::mock;
use crate::normalizer::LotterySnapshot;
use crate::types::{EntryId, IslandId, Timestamp};
use crate::view::{DataOrigin, GameRecord, IslandMap, IslandRecord};

/// Everything a full refetch produced.
#[derive(Debug, Clone, Default)]
pub struct RefreshInput {
    /// Entries from the store; non-displayable ones are ignored.
    pub approved: Vec<DataEntry>,
    /// Scraper snapshots, one per island that answered.
    pub scraped: Vec<LotterySnapshot>,
    pub backend_available: bool,
    /// When the store read behind `approved` started. Entry updates applied
    /// at or after this instant may be missing from `approved` and are
    /// merged over it. `None` takes `approved` as is.
    pub listed_at: Option<Timestamp>,
}

struct Layers {
    approved: HashMap<IslandId, Vec<DataEntry>>,
    unreviewed: HashMap<IslandId, LotterySnapshot>,
    /// Entry updates since the last refresh, with the instant each landed.
    recent: HashMap<EntryId, (Timestamp, DataEntry)>,
    mock_enabled: bool,
    backend_available: bool,
    current: Arc<IslandMap>,
}

impl Layers {
    fn assemble(&self, island: &Island, now: Timestamp) -> IslandRecord {
        if let Some(entries) = self.approved.get(island.id).filter(|e| !e.is_empty()) {
            let latest = latest_per_game(entries);
            let last_updated = latest.iter().map(|e| e.updated_at).max();
            let games = latest.iter().filter_map(|e| GameRecord::from_entry(e)).collect();
            return IslandRecord::with_games(island, None, games, last_updated, DataOrigin::Live);
        }

        if let Some(snapshot) = self.unreviewed.get(island.id) {
            let games = snapshot
                .entries
                .iter()
                .filter_map(|e| GameRecord::from_entry(e))
                .collect();
            return IslandRecord::with_games(
                island,
                snapshot.operator.as_deref(),
                games,
                Some(snapshot.last_updated),
                DataOrigin::Unreviewed,
            );
        }

        if self.mock_enabled {
            if let Ok(snapshot) = mock::mock_snapshot(island, now.date_naive(), now) {
                let games = snapshot
                    .entries
                    .iter()
                    .filter_map(|e| e.lottery().map(|d| GameRecord::from_draw(d, None)))
                    .collect();
                return IslandRecord::with_games(island, None, games, None, DataOrigin::Mock);
            }
        }

        IslandRecord::empty(island)
    }

    fn assemble_all(&self, now: Timestamp) -> IslandMap {
        IslandMap {
            islands: island::ISLANDS
                .iter()
                .map(|i| (i.id.to_string(), self.assemble(i, now)))
                .collect::<BTreeMap<_, _>>(),
            backend_available: self.backend_available,
            version: self.current.version + 1,
            refreshed_at: Some(now),
        }
    }

    /// Swap in a map with `island` re-assembled. Returns whether anything
    /// visible changed.
    fn reassemble_one(&mut self, island: &Island, now: Timestamp) -> bool {
        let record = self.assemble(island, now);
        if self.current.islands.get(island.id) == Some(&record) {
            return false;
        }
        let mut next = (*self.current).clone();
        next.islands.insert(island.id.to_string(), record);
        next.version += 1;
        self.current = Arc::new(next);
        true
    }
}

/// Latest displayable entry per game, in order of each game's first
/// appearance.
fn latest_per_game(entries: &[DataEntry]) -> Vec<&DataEntry> {
    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, &DataEntry> = HashMap::new();
    for entry in entries {
        let Some(draw) = entry.lottery() else { continue };
        let key = draw.game.to_lowercase();
        match best.get(&key) {
            None => {
                order.push(key.clone());
                best.insert(key, entry);
            }
            Some(current) => {
                let newer = entry
                    .lottery()
                    .map(|d| (d.draw_date, entry.updated_at))
                    > current.lottery().map(|d| (d.draw_date, current.updated_at));
                if newer {
                    best.insert(key, entry);
                }
            }
        }
    }
    order.iter().filter_map(|k| best.get(k).copied()).collect()
}

/// Overlay entry updates that landed at or after `listed_at` onto a store
/// listing. The later `updated_at` wins; a recent update that is no longer
/// displayable removes the listed copy.
fn merge_recent(
    listed: &mut Vec<DataEntry>,
    recent: HashMap<EntryId, (Timestamp, DataEntry)>,
    listed_at: Timestamp,
) {
    for (landed_at, entry) in recent.into_values() {
        if landed_at < listed_at {
            continue;
        }
        match listed.iter().position(|e| e.id == entry.id) {
            Some(i) if listed[i].updated_at > entry.updated_at => {}
            Some(i) => listed[i] = entry,
            None => listed.push(entry),
        }
    }
}

fn is_displayable_lottery(entry: &DataEntry) -> bool {
    entry.is_active && entry.data_type == DataType::Lottery && entry.status().is_displayable()
}

/// Owner of the assembled island view.
pub struct IslandViewAssembler {
    layers: RwLock<Layers>,
}

impl IslandViewAssembler {
    /// Build an assembler with no real data. Every island starts as mock
    /// (when enabled) or empty.
    pub fn new(mock_enabled: bool, now: Timestamp) -> Self {
        let mut layers = Layers {
            approved: HashMap::new(),
            unreviewed: HashMap::new(),
            recent: HashMap::new(),
            mock_enabled,
            backend_available: false,
            current: Arc::new(IslandMap {
                islands: BTreeMap::new(),
                backend_available: false,
                version: 0,
                refreshed_at: None,
            }),
        };
        let mut initial = layers.assemble_all(now);
        initial.version = 0;
        initial.refreshed_at = None;
        layers.current = Arc::new(initial);
        Self {
            layers: RwLock::new(layers),
        }
    }

    /// The current immutable snapshot.
    pub async fn snapshot(&self) -> Arc<IslandMap> {
        Arc::clone(&self.layers.read().await.current)
    }

    pub async fn island(&self, island_id: &str) -> Option<IslandRecord> {
        self.snapshot().await.get(island_id).cloned()
    }

    pub async fn mock_enabled(&self) -> bool {
        self.layers.read().await.mock_enabled
    }

    /// Replace every layer and swap in a freshly assembled map. Push
    /// patches received before this call are discarded; entry updates that
    /// landed after `input.listed_at` are kept when newer than the listing.
    pub async fn refresh(&self, input: RefreshInput, now: Timestamp) -> Arc<IslandMap> {
        let unreviewed = input
            .scraped
            .into_iter()
            .map(|s| (s.island_id.clone(), s))
            .collect();

        let mut layers = self.layers.write().await;
        let recent = std::mem::take(&mut layers.recent);
        let mut listed = input.approved;
        if let Some(listed_at) = input.listed_at {
            merge_recent(&mut listed, recent, listed_at);
        }

        let mut approved: HashMap<IslandId, Vec<DataEntry>> = HashMap::new();
        for entry in listed.into_iter().filter(is_displayable_lottery) {
            approved.entry(entry.island_id.clone()).or_default().push(entry);
        }
        layers.approved = approved;
        layers.unreviewed = unreviewed;
        layers.backend_available = input.backend_available;
        let next = Arc::new(layers.assemble_all(now));
        layers.current = Arc::clone(&next);
        next
    }

    /// Apply a push update for one island. Applying the same snapshot
    /// twice leaves the view as after the first application.
    ///
    /// Returns whether the visible record changed.
    pub async fn apply_patch(&self, snapshot: LotterySnapshot, now: Timestamp) -> bool {
        let Some(island) = island::find(&snapshot.island_id) else {
            return false;
        };
        let mut layers = self.layers.write().await;
        layers.unreviewed.insert(island.id.to_string(), snapshot);
        layers.reassemble_one(island, now)
    }

    /// Reflect a stored entry's new state (after a transition or upsert).
    /// Returns whether the visible record changed.
    pub async fn upsert_entry(&self, entry: &DataEntry, now: Timestamp) -> bool {
        if entry.data_type != DataType::Lottery {
            return false;
        }
        let Some(island) = island::find(&entry.island_id) else {
            return false;
        };
        let mut layers = self.layers.write().await;
        layers.recent.insert(entry.id.clone(), (now, entry.clone()));
        let list = layers.approved.entry(island.id.to_string()).or_default();
        list.retain(|e| e.id != entry.id);
        if is_displayable_lottery(entry) {
            list.push(entry.clone());
        }
        layers.reassemble_one(island, now)
    }
}
