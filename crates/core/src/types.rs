/// Entry identifiers are opaque document ids (scraper-derived or store-assigned).
pub type EntryId = String;

/// Island identifiers are lowercase registry keys, e.g. `"jamaica"`.
pub type IslandId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
