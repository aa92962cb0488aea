//! Long-running background tasks spawned by the binary.

pub mod auto_refresh;
