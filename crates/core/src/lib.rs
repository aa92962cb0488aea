//! Domain core for the island dashboard.
//!
//! Pure logic shared by the store, the live-update client, the
//! orchestration layer and the HTTP API:
//!
//! - [`normalizer`] turns scraper, store and mock records into [`entry::DataEntry`].
//! - [`approval`] is the entry lifecycle state machine.
//! - [`queue`] projects pending entries into the review queue.
//! - [`assembler`] owns the per-island view consumed by readers.

pub mod approval;
pub mod assembler;
pub mod audit;
pub mod entry;
pub mod error;
pub mod island;
pub mod mock;
pub mod normalizer;
pub mod queue;
pub mod types;
pub mod view;
