// src/store/mod.rs

//! Datastore contract consumed by the check workers.
//!
//! The watch records are exclusively owned by the datastore; workers read
//! cloned values and write back through [`Datastore::update_watch`], which
//! merges a [`WatchUpdate`] atomically. [`MemoryDatastore`] is the
//! reference implementation (in-memory records, on-disk artifact files);
//! a real deployment can substitute its own backend behind the same trait.

use crate::config::AppSettings;
use crate::errors::Result;
use crate::model::{Tag, Watch, WatchUpdate};

pub mod artifacts;
pub mod memory;

pub use artifacts::ArtifactStore;
pub use memory::MemoryDatastore;

/// Abstract persistence interface for watches, tags, snapshots and
/// artifacts.
pub trait Datastore: Send + Sync {
    /// Fetch a watch by id. `None` when it was deleted (possibly while a
    /// check for it was still in flight).
    fn get_watch(&self, watch_id: &str) -> Option<Watch>;

    /// Merge a field update into a watch. Missing watches are a no-op:
    /// the watch may have been deleted mid-check.
    fn update_watch(&self, watch_id: &str, update: WatchUpdate) -> Result<()>;

    /// Tags of a watch, in the watch's own tag order (the cascade
    /// resolver relies on this ordering).
    fn tags_for_watch(&self, watch_id: &str) -> Vec<Tag>;

    /// Append a history snapshot. `prior_fingerprint` is the checksum the
    /// processor computed during the check; when absent the store digests
    /// the content itself. Returns the history key actually used.
    fn save_history_snapshot(
        &self,
        watch_id: &str,
        contents: &[u8],
        timestamp: u64,
        prior_fingerprint: Option<&str>,
    ) -> Result<u64>;

    fn save_screenshot(&self, watch_id: &str, bytes: &[u8], as_error: bool) -> Result<()>;

    fn save_xpath_data(&self, watch_id: &str, data: &str, as_error: bool) -> Result<()>;

    fn save_error_text(&self, watch_id: &str, contents: &str) -> Result<()>;

    /// Latest healthy screenshot for notification payloads.
    fn get_screenshot(&self, watch_id: &str) -> Option<Vec<u8>>;

    /// Remove stale error-state artifacts. Idempotent.
    fn cleanup_error_artifacts(&self, watch_id: &str) -> Result<()>;

    /// Global application settings (the final scope of the notification
    /// cascade).
    fn settings(&self) -> AppSettings;
}
