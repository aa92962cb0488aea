//! Push-update message types and parser.
//!
//! Outbound: `{"type": "subscribe", "islands": [...]}`.
//! Inbound: `{"type": "<kind>", "island": "<id>", "data": {...}}`.
//!
//! Only `lottery_update` carries a patch. The other `<data_type>_update`
//! kinds are recognized and ignored, as are control frames.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Subscription request sent after every (re)connect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscribeMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    pub islands: &'a [String],
}

impl<'a> SubscribeMessage<'a> {
    pub fn new(islands: &'a [String]) -> Self {
        Self {
            kind: "subscribe",
            islands,
        }
    }

    pub fn to_json(&self) -> String {
        // Serializing a &str and a list of strings cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Raw inbound frame before classification.
#[derive(Debug, Deserialize)]
struct RawInbound {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    island: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// New lottery envelope for one island.
    LotteryUpdate { island: String, data: Value },

    /// `hotel_update`, `commodity_update`, `event_update`, ... Not patched.
    OtherUpdate { kind: String, island: Option<String> },

    /// Anything else (`subscribed`, `pong`, `welcome`, ...).
    Control { kind: String },
}

/// Errors for frames that cannot be applied.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("'{kind}' message is missing '{field}'")]
    MissingField { kind: String, field: &'static str },
}

/// Parse and classify one text frame.
pub fn parse_message(text: &str) -> Result<InboundMessage, MessageError> {
    let raw: RawInbound = serde_json::from_str(text)?;

    if raw.kind == "lottery_update" {
        let island = raw
            .island
            .filter(|i| !i.trim().is_empty())
            .ok_or_else(|| MessageError::MissingField {
                kind: raw.kind.clone(),
                field: "island",
            })?;
        let data = raw
            .data
            .filter(|d| !d.is_null())
            .ok_or(MessageError::MissingField {
                kind: raw.kind,
                field: "data",
            })?;
        return Ok(InboundMessage::LotteryUpdate { island, data });
    }

    if raw.kind.ends_with("_update") {
        return Ok(InboundMessage::OtherUpdate {
            kind: raw.kind,
            island: raw.island,
        });
    }

    Ok(InboundMessage::Control { kind: raw.kind })
}
