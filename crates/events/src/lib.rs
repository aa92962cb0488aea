//! In-process event distribution for the island dashboard.
//!
//! Services publish [`DashboardEvent`]s on the shared [`EventBus`]; the
//! HTTP layer and background tasks subscribe.

pub mod bus;

pub use bus::{ConnectionState, DashboardEvent, EventBus};
