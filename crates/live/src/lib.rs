//! Clients for the external scraper service.
//!
//! - [`api::ScraperApi`]: REST client with a bounded request timeout.
//! - [`channel::LiveUpdateChannel`]: the single WebSocket push-update
//!   listener, feeding validated per-island patches into the
//!   [`IslandViewAssembler`](islandboard_core::assembler::IslandViewAssembler)
//!   through a bounded mailbox.

pub mod api;
pub mod channel;
pub mod client;
pub mod messages;
pub mod processor;
pub mod reconnect;

pub use api::{ScraperApi, ScraperApiError};
pub use channel::{LiveChannelError, LiveConfig, LiveUpdateChannel};
pub use reconnect::ReconnectConfig;
pub use islandboard_events::ConnectionState;
