//! DataSourceNormalizer: one canonical [`DataEntry`] shape from three origins.
//!
//! Scraper payloads keep their fields at the top level in snake_case;
//! store documents nest them under `data.<data_type>.*` (or `data.*`) in
//! camelCase; the mock generator emits the scraper shape. Each field is
//! described by an ordered list of candidate paths plus a type guard, and
//! the first present, non-null value that passes the guard wins.
//!
//! Missing required fields are a [`CoreError::Validation`] naming the
//! field. Currency mismatches against the island's expected currency are
//! attached as warnings and never block normalization.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::entry::{
    ApprovalInfo, ApprovalLevel, CommodityPrice, DataEntry, DataSource, DataType, HotelRate,
    IslandEvent, LotteryDraw, NormalizationWarning, Payload,
};
use crate::error::CoreError;
use crate::island::{self, Island};
use crate::types::{IslandId, Timestamp};

/* --------------------------------------------------------------------------
Inputs and outputs
-------------------------------------------------------------------------- */

/// Which collaborator produced a raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Scraper REST summary or WebSocket push.
    Scraper,
    /// A document from the persisted store (admin-entered data).
    Firestore,
    /// The static mock generator.
    Mock,
}

/// A raw record awaiting normalization.
#[derive(Debug, Clone, Copy)]
pub struct RawRecord<'a> {
    pub origin: Origin,
    pub data_type: DataType,
    pub island_id: &'a str,
    pub body: &'a Value,
}

/// A normalized lottery envelope (one island's full set of games).
#[derive(Debug, Clone, PartialEq)]
pub struct LotterySnapshot {
    pub island_id: IslandId,
    pub operator: Option<String>,
    /// Normalized games in source order.
    pub entries: Vec<DataEntry>,
    pub last_updated: Timestamp,
}

/* --------------------------------------------------------------------------
Field rules
-------------------------------------------------------------------------- */

type Guard = fn(&Value) -> bool;

/// A field: its canonical name, accepted key spellings, and type guard.
struct FieldRule {
    name: &'static str,
    keys: &'static [&'static str],
    guard: Guard,
}

const fn rule(name: &'static str, keys: &'static [&'static str], guard: Guard) -> FieldRule {
    FieldRule { name, keys, guard }
}

const ID: FieldRule = rule("id", &["id", "doc_id", "documentId"], is_text);
const CREATED_AT: FieldRule = rule("created_at", &["created_at", "createdAt"], is_timestamp);
const UPDATED_AT: FieldRule = rule(
    "updated_at",
    &["updated_at", "updatedAt", "last_updated", "lastUpdated"],
    is_timestamp,
);
const IS_ACTIVE: FieldRule = rule("is_active", &["is_active", "isActive"], Value::is_boolean);
const SOURCE: FieldRule = rule("source", &["source"], is_text);
const APPROVAL_LEVEL: FieldRule = rule(
    "approval_level",
    &["approval_level", "approvalLevel"],
    is_text,
);
const CURRENCY: FieldRule = rule("currency", &["currency", "currencyCode"], is_text);

const GAME: FieldRule = rule("game", &["game", "game_name", "gameName"], is_text);
const NUMBERS: FieldRule = rule(
    "numbers",
    &["numbers", "winning_numbers", "winningNumbers"],
    is_number_list,
);
const DRAW_DATE: FieldRule = rule("draw_date", &["draw_date", "drawDate", "date"], is_date);
const JACKPOT: FieldRule = rule("jackpot", &["jackpot", "jackpotAmount"], is_amount);
const DRAW_NUMBER: FieldRule = rule(
    "draw_number",
    &["draw_number", "drawNumber"],
    is_unsigned,
);
const DRAW_TIME: FieldRule = rule("draw_time", &["draw_time", "drawTime"], is_text);

const HOTEL_NAME: FieldRule = rule(
    "hotel_name",
    &["hotel_name", "hotelName", "name"],
    is_text,
);
const RATE: FieldRule = rule("rate", &["rate", "nightly_rate", "nightlyRate", "price"], is_amount);
const ROOM_TYPE: FieldRule = rule("room_type", &["room_type", "roomType"], is_text);

const COMMODITY: FieldRule = rule("commodity", &["commodity", "name", "item"], is_text);
const PRICE: FieldRule = rule("price", &["price", "amount"], is_amount);
const UNIT: FieldRule = rule("unit", &["unit"], is_text);

const TITLE: FieldRule = rule("title", &["title", "name"], is_text);
const EVENT_DATE: FieldRule = rule("event_date", &["event_date", "eventDate", "date"], is_date);
const VENUE: FieldRule = rule("venue", &["venue", "location"], is_text);
const DESCRIPTION: FieldRule = rule("description", &["description"], is_text);

/* --------------------------------------------------------------------------
Public API
-------------------------------------------------------------------------- */

/// Normalize one raw record into a draft [`DataEntry`].
///
/// `now` stamps `created_at`/`updated_at` when the record carries none.
pub fn normalize(raw: RawRecord<'_>, now: Timestamp) -> Result<DataEntry, CoreError> {
    let island = island::require(raw.island_id, "island_id")?;
    let fields = Fields::new(raw.body, raw.data_type);
    let mut warnings = Vec::new();

    let payload = match raw.data_type {
        DataType::Lottery => Payload::Lottery(lottery_payload(&fields, island, &mut warnings)?),
        DataType::Hotel => Payload::Hotel(HotelRate {
            hotel_name: fields.required_text(&HOTEL_NAME)?,
            rate: fields.required_amount(&RATE)?,
            currency: currency(&fields, island, &mut warnings),
            room_type: fields.text(&ROOM_TYPE),
        }),
        DataType::Commodity => Payload::Commodity(CommodityPrice {
            commodity: fields.required_text(&COMMODITY)?,
            price: fields.required_amount(&PRICE)?,
            currency: currency(&fields, island, &mut warnings),
            unit: fields.text(&UNIT),
        }),
        DataType::Event => Payload::Event(IslandEvent {
            title: fields.required_text(&TITLE)?,
            event_date: fields.required_date(&EVENT_DATE)?,
            venue: fields.text(&VENUE),
            description: fields.text(&DESCRIPTION),
        }),
    };

    let source = match raw.origin {
        Origin::Scraper => DataSource::Scraper,
        Origin::Mock => DataSource::Imported,
        Origin::Firestore => match fields.text(&SOURCE) {
            Some(s) => s.parse()?,
            None => DataSource::AdminEntry,
        },
    };

    let approval_level = match fields.text(&APPROVAL_LEVEL) {
        Some(level) => level.parse()?,
        None => ApprovalLevel::IslandAdmin,
    };

    let created_at = fields.timestamp(&CREATED_AT).unwrap_or(now);
    let updated_at = fields.timestamp(&UPDATED_AT).unwrap_or(created_at);
    let id = fields
        .text(&ID)
        .unwrap_or_else(|| derive_entry_id(island.id, &payload));

    Ok(DataEntry {
        id,
        island_id: island.id.to_string(),
        data_type: raw.data_type,
        source,
        payload,
        approval: ApprovalInfo::draft(approval_level),
        created_at,
        updated_at,
        is_active: fields.lookup(&IS_ACTIVE).and_then(Value::as_bool).unwrap_or(true),
        submitted_at: None,
        submitted_by: None,
        warnings,
    })
}

/// Normalize a per-island lottery envelope:
/// `{ island, operator, games: [...], last_updated, total_games }`.
///
/// Every game is normalized; a single invalid game rejects the whole
/// envelope so that a snapshot is never applied partially.
pub fn normalize_lottery_envelope(
    origin: Origin,
    island_id: &str,
    envelope: &Value,
    now: Timestamp,
) -> Result<LotterySnapshot, CoreError> {
    let island = island::require(island_id, "island")?;
    if let Some(declared) = envelope.get("island").and_then(Value::as_str) {
        if !declared.eq_ignore_ascii_case(island.id) {
            return Err(CoreError::validation(
                "island",
                format!("Envelope is for '{declared}', expected '{}'", island.id),
            ));
        }
    }

    let games = envelope
        .get("games")
        .and_then(Value::as_array)
        .filter(|games| !games.is_empty())
        .ok_or_else(|| CoreError::validation("games", "must be a non-empty list"))?;

    let entries = games
        .iter()
        .map(|game| {
            normalize(
                RawRecord {
                    origin,
                    data_type: DataType::Lottery,
                    island_id: island.id,
                    body: game,
                },
                now,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Prefer the envelope's own timestamp; otherwise the newest draw date
    // keeps re-applying the same envelope deterministic.
    let last_updated = Fields::new(envelope, DataType::Lottery)
        .timestamp(&UPDATED_AT)
        .or_else(|| {
            entries
                .iter()
                .filter_map(|e| e.lottery().map(|d| d.draw_date))
                .max()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| Utc.from_utc_datetime(&dt))
        })
        .unwrap_or(now);

    Ok(LotterySnapshot {
        island_id: island.id.to_string(),
        operator: envelope
            .get("operator")
            .and_then(Value::as_str)
            .map(str::to_string),
        entries,
        last_updated,
    })
}

/// Stable id for a record that arrived without one.
///
/// Lottery draws get a readable `island-lottery-game-date[-number]` id so
/// re-fetching the same draw maps to the same entry; other types hash
/// their canonical payload.
pub fn derive_entry_id(island_id: &str, payload: &Payload) -> String {
    match payload {
        Payload::Lottery(draw) => {
            let game: String = draw
                .game
                .to_lowercase()
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect();
            match draw.draw_number {
                Some(n) => format!("{island_id}-lottery-{game}-{}-{n}", draw.draw_date),
                None => format!("{island_id}-lottery-{game}-{}", draw.draw_date),
            }
        }
        other => {
            let canonical = serde_json::to_string(other).unwrap_or_default();
            let digest = Sha256::digest(canonical.as_bytes());
            let hex: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
            format!("{island_id}-{}-{hex}", other.data_type())
        }
    }
}

/* --------------------------------------------------------------------------
Payload builders
-------------------------------------------------------------------------- */

fn lottery_payload(
    fields: &Fields<'_>,
    island: &Island,
    warnings: &mut Vec<NormalizationWarning>,
) -> Result<LotteryDraw, CoreError> {
    let numbers = fields
        .required(&NUMBERS)?
        .as_array()
        .map(|items| items.iter().filter_map(as_u32).collect())
        .unwrap_or_default();

    Ok(LotteryDraw {
        game: fields.required_text(&GAME)?,
        numbers,
        draw_date: fields.required_date(&DRAW_DATE)?,
        jackpot: fields.lookup(&JACKPOT).and_then(as_amount),
        currency: currency(fields, island, warnings),
        draw_number: fields.lookup(&DRAW_NUMBER).and_then(as_u64),
        draw_time: fields.text(&DRAW_TIME),
    })
}

fn currency(
    fields: &Fields<'_>,
    island: &Island,
    warnings: &mut Vec<NormalizationWarning>,
) -> Option<String> {
    let code = fields.text(&CURRENCY)?.trim().to_uppercase();
    if code != island.currency {
        warnings.push(NormalizationWarning {
            field: CURRENCY.name.to_string(),
            message: format!(
                "Currency '{code}' does not match {}'s expected '{}'",
                island.display_name, island.currency
            ),
        });
    }
    Some(code)
}

/* --------------------------------------------------------------------------
Path lookup
-------------------------------------------------------------------------- */

/// A raw body plus the nesting prefixes to search, in priority order:
/// top level, then `data.<data_type>`, then `data`.
struct Fields<'a> {
    body: &'a Value,
    nested: [[&'static str; 2]; 1],
}

impl<'a> Fields<'a> {
    fn new(body: &'a Value, data_type: DataType) -> Self {
        Self {
            body,
            nested: [["data", data_type.as_str()]],
        }
    }

    /// Candidate paths for `rule`, highest priority first.
    fn paths(&self, rule: &FieldRule) -> Vec<Vec<&'static str>> {
        let mut paths: Vec<Vec<&'static str>> = rule.keys.iter().map(|k| vec![*k]).collect();
        for prefix in &self.nested {
            paths.extend(rule.keys.iter().map(|k| vec![prefix[0], prefix[1], *k]));
        }
        paths.extend(rule.keys.iter().map(|k| vec!["data", *k]));
        paths
    }

    /// First present, non-null value at any candidate path passing the guard.
    fn lookup(&self, rule: &FieldRule) -> Option<&'a Value> {
        self.paths(rule)
            .into_iter()
            .filter_map(|path| walk(self.body, &path))
            .find(|v| !v.is_null() && (rule.guard)(v))
    }

    fn required(&self, rule: &FieldRule) -> Result<&'a Value, CoreError> {
        if let Some(value) = self.lookup(rule) {
            return Ok(value);
        }
        let present = self
            .paths(rule)
            .into_iter()
            .filter_map(|path| walk(self.body, &path))
            .any(|v| !v.is_null());
        let message = if present {
            "is present but empty or of the wrong type"
        } else {
            "is required"
        };
        Err(CoreError::validation(rule.name, message))
    }

    fn text(&self, rule: &FieldRule) -> Option<String> {
        self.lookup(rule)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
    }

    fn required_text(&self, rule: &FieldRule) -> Result<String, CoreError> {
        self.required(rule)
            .map(|v| v.as_str().unwrap_or_default().trim().to_string())
    }

    fn required_amount(&self, rule: &FieldRule) -> Result<f64, CoreError> {
        let value = self.required(rule)?;
        as_amount(value).ok_or_else(|| CoreError::validation(rule.name, "is not a number"))
    }

    fn required_date(&self, rule: &FieldRule) -> Result<NaiveDate, CoreError> {
        let value = self.required(rule)?;
        as_date(value).ok_or_else(|| CoreError::validation(rule.name, "is not a date"))
    }

    fn timestamp(&self, rule: &FieldRule) -> Option<Timestamp> {
        self.lookup(rule).and_then(as_timestamp)
    }
}

fn walk<'v>(body: &'v Value, path: &[&str]) -> Option<&'v Value> {
    path.iter().try_fold(body, |node, key| node.get(*key))
}

/* --------------------------------------------------------------------------
Type guards and conversions
-------------------------------------------------------------------------- */

fn is_text(v: &Value) -> bool {
    v.as_str().is_some_and(|s| !s.trim().is_empty())
}

fn is_number_list(v: &Value) -> bool {
    v.as_array()
        .is_some_and(|items| !items.is_empty() && items.iter().all(|i| as_u32(i).is_some()))
}

fn is_amount(v: &Value) -> bool {
    as_amount(v).is_some()
}

fn is_unsigned(v: &Value) -> bool {
    as_u64(v).is_some()
}

fn is_date(v: &Value) -> bool {
    as_date(v).is_some()
}

fn is_timestamp(v: &Value) -> bool {
    as_timestamp(v).is_some()
}

fn as_u64(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_u32(v: &Value) -> Option<u32> {
    as_u64(v).and_then(|n| u32::try_from(n).ok())
}

/// Numbers stay numbers; strings like `"$1,250,000"` are accepted too.
fn as_amount(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .trim_start_matches('$')
                .chars()
                .filter(|c| *c != ',')
                .collect();
            cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
        }
        _ => None,
    }
}

fn as_date(v: &Value) -> Option<NaiveDate> {
    let s = v.as_str()?.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

/// RFC 3339 strings, or store timestamps `{ seconds, nanoseconds }`
/// (also `_seconds` / `_nanoseconds`).
fn as_timestamp(v: &Value) -> Option<Timestamp> {
    match v {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Object(map) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Utc.timestamp_opt(seconds, u32::try_from(nanos).ok()?).single()
        }
        _ => None,
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
