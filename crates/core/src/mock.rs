//! Deterministic mock lottery data.
//!
//! Output is emitted in the scraper's envelope shape and goes through the
//! normalizer like any other source, so mock data can never bypass
//! validation. The same island and date always yield the same numbers.

use chrono::NaiveDate;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::error::CoreError;
use crate::island::{GameSpec, Island};
use crate::normalizer::{self, LotterySnapshot, Origin};
use crate::types::Timestamp;

/// Scraper-shaped envelope `{ island, operator, games, total_games }`.
pub fn mock_envelope(island: &Island, date: NaiveDate) -> Value {
    let games: Vec<Value> = island
        .games
        .iter()
        .map(|game| {
            let mut draw = json!({
                "game": game.name,
                "numbers": draw_numbers(island.id, game, date),
                "draw_date": date.to_string(),
            });
            if game.picks >= 5 {
                draw["jackpot"] = json!(jackpot(island.id, game, date));
                draw["currency"] = json!(island.currency);
            }
            draw
        })
        .collect();

    json!({
        "island": island.id,
        "operator": island.operator,
        "total_games": games.len(),
        "games": games,
    })
}

/// Normalized mock snapshot for `island` on `date`.
pub fn mock_snapshot(
    island: &Island,
    date: NaiveDate,
    now: Timestamp,
) -> Result<LotterySnapshot, CoreError> {
    normalizer::normalize_lottery_envelope(Origin::Mock, island.id, &mock_envelope(island, date), now)
}

/// Digit games (max <= 9) may repeat values; ball games draw distinct,
/// sorted numbers.
fn draw_numbers(island_id: &str, game: &GameSpec, date: NaiveDate) -> Vec<u32> {
    let min = u32::from(game.min);
    let span = u32::from(game.max) - min + 1;
    let picks = usize::from(game.picks);
    let digits = game.max <= 9;

    let mut numbers = Vec::with_capacity(picks);
    let mut counter = 0u32;
    while numbers.len() < picks && counter < 1024 {
        let n = min + seed(island_id, game.name, date, counter) % span;
        counter += 1;
        if digits || !numbers.contains(&n) {
            numbers.push(n);
        }
    }
    if !digits {
        numbers.sort_unstable();
    }
    numbers
}

fn jackpot(island_id: &str, game: &GameSpec, date: NaiveDate) -> f64 {
    let millions = 1 + seed(island_id, game.name, date, u32::MAX) % 50;
    f64::from(millions) * 1_000_000.0
}

fn seed(island_id: &str, game: &str, date: NaiveDate, counter: u32) -> u32 {
    let digest = Sha256::new()
        .chain_update(island_id.as_bytes())
        .chain_update(b"|")
        .chain_update(game.as_bytes())
        .chain_update(b"|")
        .chain_update(date.to_string().as_bytes())
        .chain_update(counter.to_be_bytes())
        .finalize();
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}
