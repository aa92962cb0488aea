pub mod approvals;
pub mod audit;
pub mod entries;
pub mod health;
pub mod islands;
pub mod live;
pub mod preferences;
