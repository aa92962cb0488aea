pub mod audit;
pub mod entry;
