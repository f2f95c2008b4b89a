// src/processor/mod.rs

//! Pluggable change-detection processor abstraction.
//!
//! The worker talks to a [`ChangeProcessor`] instead of a concrete fetch
//! implementation. Production embedders plug in their fetch/diff backends
//! (plain HTTP text diff, browser-driven, restock extraction); tests swap
//! in a scripted fake.
//!
//! A fresh processor is constructed per attempt through
//! [`ProcessorFactory::make`], selected by the watch's configured kind, so
//! no fetch state leaks between checks.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use crate::errors::CheckFailure;
use crate::model::{Watch, WatchUpdate};
use crate::types::ProcessorKind;

/// Artifacts every fetch produces regardless of outcome. Persisted by the
/// state updater after each attempt.
#[derive(Debug, Clone, Default)]
pub struct FetchArtifacts {
    pub screenshot: Option<Vec<u8>>,
    pub xpath_data: Option<String>,
    /// Response headers, keys lowercased.
    pub headers: HashMap<String, String>,
}

/// Successful comparison result: whether the content changed, the field
/// updates to persist, and the raw content bytes for the history snapshot.
#[derive(Debug, Default)]
pub struct CheckSuccess {
    pub changed: bool,
    pub update: WatchUpdate,
    pub contents: Vec<u8>,
}

/// Everything one check attempt yields.
#[derive(Debug)]
pub struct CheckReport {
    pub outcome: std::result::Result<CheckSuccess, CheckFailure>,
    pub fetch: FetchArtifacts,
}

/// Trait abstracting how a single check is performed.
///
/// Implementations are free to:
/// - fetch and compare real page content (production)
/// - replay a scripted outcome (tests)
pub trait ChangeProcessor: Send {
    /// Fetch the watch's target and compare against its stored state.
    ///
    /// `skip_when_checksum_same` asks the processor to bail out with
    /// [`CheckFailure::ChecksumUnchanged`] when the fetched content's
    /// fingerprint matches the previous check.
    fn perform_check<'a>(
        &'a mut self,
        watch: &'a Watch,
        skip_when_checksum_same: bool,
    ) -> Pin<Box<dyn Future<Output = CheckReport> + Send + 'a>>;
}

/// Constructs a fresh processor per check attempt.
pub trait ProcessorFactory: Send + Sync {
    fn make(&self, kind: ProcessorKind) -> Box<dyn ChangeProcessor>;
}
