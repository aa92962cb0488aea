//! The canonical data entry and its embedded approval state.
//!
//! Every lottery draw, hotel rate, commodity price and event on the
//! dashboard is a [`DataEntry`], regardless of whether it came from the
//! scraper, an admin, or the mock generator.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{EntryId, IslandId, Timestamp};

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Defines `as_str`, `ALL`, `Display` and `FromStr` for a plain string enum.
macro_rules! string_enum {
    ($name:ident, $what:literal, { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $s),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok($name::$variant),)+
                    other => Err(CoreError::validation(
                        $what,
                        format!(
                            "Invalid {} '{other}'. Must be one of: {}",
                            $what,
                            [$($s),+].join(", ")
                        ),
                    )),
                }
            }
        }
    };
}

/// Kind of factual content an entry carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Lottery,
    Hotel,
    Commodity,
    Event,
}

string_enum!(DataType, "data_type", {
    Lottery => "lottery",
    Hotel => "hotel",
    Commodity => "commodity",
    Event => "event",
});

/// Where an entry originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Scraper,
    AdminEntry,
    Manual,
    Imported,
}

string_enum!(DataSource, "source", {
    Scraper => "scraper",
    AdminEntry => "admin_entry",
    Manual => "manual",
    Imported => "imported",
});

/// Lifecycle state of an entry. See [`crate::approval`] for the edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Draft,
    PendingApproval,
    Approved,
    Published,
    Rejected,
    RequiresChanges,
    Archived,
}

string_enum!(ApprovalStatus, "status", {
    Draft => "draft",
    PendingApproval => "pending_approval",
    Approved => "approved",
    Published => "published",
    Rejected => "rejected",
    RequiresChanges => "requires_changes",
    Archived => "archived",
});

impl ApprovalStatus {
    /// States that carry `reviewed_at` / `reviewed_by`.
    pub fn is_reviewed(self) -> bool {
        matches!(
            self,
            Self::Approved | Self::Rejected | Self::RequiresChanges
        )
    }

    /// States whose content may be shown to end users as real data.
    pub fn is_displayable(self) -> bool {
        matches!(self, Self::Approved | Self::Published)
    }
}

/// Who must act on an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalLevel {
    IslandAdmin,
    SuperAdmin,
}

string_enum!(ApprovalLevel, "approval_level", {
    IslandAdmin => "island_admin",
    SuperAdmin => "super_admin",
});

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// One lottery draw result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotteryDraw {
    pub game: String,
    pub numbers: Vec<u32>,
    pub draw_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jackpot: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draw_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draw_time: Option<String>,
}

/// A nightly hotel rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelRate {
    pub hotel_name: String,
    pub rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_type: Option<String>,
}

/// A market price for a commodity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityPrice {
    pub commodity: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// A scheduled event on an island.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IslandEvent {
    pub title: String,
    pub event_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Type-specific content of an entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Lottery(LotteryDraw),
    Hotel(HotelRate),
    Commodity(CommodityPrice),
    Event(IslandEvent),
}

impl Payload {
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Lottery(_) => DataType::Lottery,
            Self::Hotel(_) => DataType::Hotel,
            Self::Commodity(_) => DataType::Commodity,
            Self::Event(_) => DataType::Event,
        }
    }

    /// Decode a stored payload whose shape is dictated by `data_type`.
    pub fn from_value(data_type: DataType, value: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match data_type {
            DataType::Lottery => Self::Lottery(serde_json::from_value(value)?),
            DataType::Hotel => Self::Hotel(serde_json::from_value(value)?),
            DataType::Commodity => Self::Commodity(serde_json::from_value(value)?),
            DataType::Event => Self::Event(serde_json::from_value(value)?),
        })
    }

    /// Short human label for the review queue.
    pub fn title(&self) -> String {
        match self {
            Self::Lottery(d) => format!("{} draw {}", d.game, d.draw_date),
            Self::Hotel(h) => format!("{} rate", h.hotel_name),
            Self::Commodity(c) => format!("{} price", c.commodity),
            Self::Event(e) => e.title.clone(),
        }
    }

    /// One-line description of the content for the review queue.
    pub fn summary(&self) -> String {
        fn money(amount: f64, currency: &Option<String>) -> String {
            match currency {
                Some(c) => format!("{c} {amount:.2}"),
                None => format!("{amount:.2}"),
            }
        }

        match self {
            Self::Lottery(d) => {
                let numbers: Vec<String> = d.numbers.iter().map(u32::to_string).collect();
                format!("Numbers: {}", numbers.join("-"))
            }
            Self::Hotel(h) => match &h.room_type {
                Some(room) => format!("{} per night ({room})", money(h.rate, &h.currency)),
                None => format!("{} per night", money(h.rate, &h.currency)),
            },
            Self::Commodity(c) => match &c.unit {
                Some(unit) => format!("{} per {unit}", money(c.price, &c.currency)),
                None => money(c.price, &c.currency),
            },
            Self::Event(e) => match &e.venue {
                Some(venue) => format!("{} at {venue}", e.event_date),
                None => e.event_date.to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// Approval state embedded in every [`DataEntry`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalInfo {
    pub status: ApprovalStatus,
    pub approval_level: ApprovalLevel,
    /// Populated only while `status == RequiresChanges`.
    pub change_requests: Option<String>,
    pub reviewed_at: Option<Timestamp>,
    pub reviewed_by: Option<String>,
}

impl ApprovalInfo {
    /// Fresh approval state for a newly created entry.
    pub fn draft(approval_level: ApprovalLevel) -> Self {
        Self {
            status: ApprovalStatus::Draft,
            approval_level,
            change_requests: None,
            reviewed_at: None,
            reviewed_by: None,
        }
    }

    /// `reviewed_*` are set iff the status is a reviewed state, and
    /// `change_requests` only while changes are requested.
    pub fn is_consistent(&self) -> bool {
        let reviewed = self.status.is_reviewed();
        reviewed == self.reviewed_at.is_some()
            && reviewed == self.reviewed_by.is_some()
            && (self.status == ApprovalStatus::RequiresChanges) == self.change_requests.is_some()
    }
}

/// A non-blocking observation attached during normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizationWarning {
    pub field: String,
    pub message: String,
}

/// One unit of factual content with an approval lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataEntry {
    pub id: EntryId,
    pub island_id: IslandId,
    pub data_type: DataType,
    pub source: DataSource,
    pub payload: Payload,
    pub approval: ApprovalInfo,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Soft-delete flag.
    pub is_active: bool,
    /// When the entry last entered `pending_approval`.
    pub submitted_at: Option<Timestamp>,
    pub submitted_by: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<NormalizationWarning>,
}

impl DataEntry {
    pub fn status(&self) -> ApprovalStatus {
        self.approval.status
    }

    /// Lottery payload, if this is a lottery entry.
    pub fn lottery(&self) -> Option<&LotteryDraw> {
        match &self.payload {
            Payload::Lottery(draw) => Some(draw),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
