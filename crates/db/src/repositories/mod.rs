//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept a Postgres executor (pool or open transaction) first.

pub mod audit_repo;
pub mod entry_repo;

pub use audit_repo::AuditLogRepo;
pub use entry_repo::DataEntryRepo;
