// src/model/mod.rs

//! Persistent data model: watches, their history, and tags.

pub mod tag;
pub mod watch;

pub use tag::Tag;
pub use watch::{History, LastError, Snapshot, Watch, WatchUpdate};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in whole seconds. History keys and `last_checked`
/// timestamps use this resolution.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
