//! Island registry.
//!
//! Islands are the partition key for every piece of data on the
//! dashboard. The set is fixed at compile time; the live-update channel
//! subscribes to exactly these ids.

use serde::Serialize;

use crate::error::CoreError;

/// A lottery game offered on an island, used by the mock generator.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GameSpec {
    pub name: &'static str,
    /// How many numbers are drawn.
    pub picks: u8,
    /// Smallest drawable number.
    pub min: u8,
    /// Largest drawable number.
    pub max: u8,
}

/// One Caribbean jurisdiction.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Island {
    pub id: &'static str,
    pub display_name: &'static str,
    pub operator: &'static str,
    /// ISO 4217 code prices on this island are expected to use.
    pub currency: &'static str,
    pub games: &'static [GameSpec],
}

const fn game(name: &'static str, picks: u8, min: u8, max: u8) -> GameSpec {
    GameSpec {
        name,
        picks,
        min,
        max,
    }
}

/// Every island known to the dashboard, in display order.
pub const ISLANDS: &[Island] = &[
    Island {
        id: "jamaica",
        display_name: "Jamaica",
        operator: "Supreme Ventures",
        currency: "JMD",
        games: &[
            game("Lotto", 6, 1, 38),
            game("Super Lotto", 5, 1, 35),
            game("Cash Pot", 1, 1, 36),
            game("Pick 3", 3, 0, 9),
            game("Pick 4", 4, 0, 9),
        ],
    },
    Island {
        id: "trinidad",
        display_name: "Trinidad & Tobago",
        operator: "NLCB",
        currency: "TTD",
        games: &[
            game("Lotto Plus", 5, 1, 35),
            game("Cash Pot", 1, 1, 36),
            game("Play Whe", 1, 1, 36),
            game("Pick 2", 2, 0, 9),
            game("Pick 4", 4, 0, 9),
        ],
    },
    Island {
        id: "barbados",
        display_name: "Barbados",
        operator: "Barbados Lottery",
        currency: "BBD",
        games: &[
            game("Mega 6", 6, 1, 36),
            game("Double Draw", 5, 1, 30),
            game("Pick 3", 3, 0, 9),
        ],
    },
    Island {
        id: "guyana",
        display_name: "Guyana",
        operator: "Guyana Lottery Company",
        currency: "GYD",
        games: &[
            game("Supa 6", 6, 1, 40),
            game("Draw de Line", 5, 1, 32),
            game("Pick 3", 3, 0, 9),
        ],
    },
    Island {
        id: "st_lucia",
        display_name: "Saint Lucia",
        operator: "Saint Lucia National Lotteries Authority",
        currency: "XCD",
        games: &[game("Power Play", 5, 1, 35), game("Dream Team", 2, 1, 20)],
    },
    Island {
        id: "grenada",
        display_name: "Grenada",
        operator: "Grenada National Lottery Authority",
        currency: "XCD",
        games: &[game("Daily Cash", 4, 1, 25), game("Pick 3", 3, 0, 9)],
    },
];

/// Look up an island by id (case-insensitive).
pub fn find(id: &str) -> Option<&'static Island> {
    ISLANDS.iter().find(|i| i.id.eq_ignore_ascii_case(id))
}

/// Look up an island by id, failing with a validation error naming `field`.
pub fn require(id: &str, field: &str) -> Result<&'static Island, CoreError> {
    find(id).ok_or_else(|| {
        CoreError::validation(
            field,
            format!(
                "Unknown island '{id}'. Must be one of: {}",
                island_ids().collect::<Vec<_>>().join(", ")
            ),
        )
    })
}

/// All island ids in registry order.
pub fn island_ids() -> impl Iterator<Item = &'static str> {
    ISLANDS.iter().map(|i| i.id)
}
