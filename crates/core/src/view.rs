//! Assembled per-island view consumed by readers.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::entry::{DataEntry, LotteryDraw};
use crate::island::Island;
use crate::types::{EntryId, IslandId, Timestamp};

/// Where the data in an [`IslandRecord`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    /// Approved or published entries.
    Live,
    /// The latest scraper snapshot or push patch; not yet reviewed.
    Unreviewed,
    /// Synthesized demo data. Never carries `last_updated`.
    Mock,
    /// Nothing to show.
    None,
}

/// One game line on an island card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameRecord {
    pub game: String,
    pub numbers: Vec<u32>,
    pub draw_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jackpot: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw_time: Option<String>,
    /// Backing entry, when the game is stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<EntryId>,
}

impl GameRecord {
    pub fn from_draw(draw: &LotteryDraw, entry_id: Option<EntryId>) -> Self {
        Self {
            game: draw.game.clone(),
            numbers: draw.numbers.clone(),
            draw_date: draw.draw_date,
            jackpot: draw.jackpot,
            draw_number: draw.draw_number,
            draw_time: draw.draw_time.clone(),
            entry_id,
        }
    }

    pub fn from_entry(entry: &DataEntry) -> Option<Self> {
        entry
            .lottery()
            .map(|draw| Self::from_draw(draw, Some(entry.id.clone())))
    }
}

/// The assembled record for one island.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IslandRecord {
    pub id: IslandId,
    pub display_name: String,
    pub operator: String,
    /// Source order.
    pub games: Vec<GameRecord>,
    /// Only set for [`DataOrigin::Live`] and [`DataOrigin::Unreviewed`].
    pub last_updated: Option<Timestamp>,
    pub total_games: usize,
    pub origin: DataOrigin,
}

impl IslandRecord {
    /// An island with nothing to display.
    pub fn empty(island: &Island) -> Self {
        Self {
            id: island.id.to_string(),
            display_name: island.display_name.to_string(),
            operator: island.operator.to_string(),
            games: Vec::new(),
            last_updated: None,
            total_games: 0,
            origin: DataOrigin::None,
        }
    }

    pub(crate) fn with_games(
        island: &Island,
        operator: Option<&str>,
        games: Vec<GameRecord>,
        last_updated: Option<Timestamp>,
        origin: DataOrigin,
    ) -> Self {
        let last_updated = match origin {
            DataOrigin::Mock | DataOrigin::None => None,
            DataOrigin::Live | DataOrigin::Unreviewed => last_updated,
        };
        Self {
            id: island.id.to_string(),
            display_name: island.display_name.to_string(),
            operator: operator.unwrap_or(island.operator).to_string(),
            total_games: games.len(),
            games,
            last_updated,
            origin,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn is_mock(&self) -> bool {
        self.origin == DataOrigin::Mock
    }
}

/// Immutable snapshot of every island, swapped as a whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IslandMap {
    /// Keyed by island id; iteration follows registry order via [`IslandMap::ordered`].
    pub islands: BTreeMap<IslandId, IslandRecord>,
    /// Whether the scraper answered the last full refresh.
    pub backend_available: bool,
    /// Incremented on every swap.
    pub version: u64,
    pub refreshed_at: Option<Timestamp>,
}

impl IslandMap {
    pub fn get(&self, island_id: &str) -> Option<&IslandRecord> {
        self.islands.get(&island_id.to_ascii_lowercase())
    }

    /// Records in island-registry order.
    pub fn ordered(&self) -> Vec<&IslandRecord> {
        crate::island::island_ids()
            .filter_map(|id| self.islands.get(id))
            .collect()
    }
}
