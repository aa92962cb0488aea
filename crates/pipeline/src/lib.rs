//! Orchestration between the domain core, the store, the scraper and the
//! event bus.
//!
//! - [`ApprovalQueue`]: the live review queue with single and batch
//!   transitions and statistics.
//! - [`RefreshService`]: full refetch of scraper and store data into the
//!   island view.

pub mod approvals;
pub mod refresh;

pub use approvals::{ApprovalQueue, BatchItemResult, BatchReport, NewEntry};
pub use refresh::{RefreshReport, RefreshService};
