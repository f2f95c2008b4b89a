// src/model/watch.rs

//! The watch record, its snapshot history, and the atomic field-update
//! mechanism used by every worker-side mutation.

use std::collections::BTreeMap;

use crate::fingerprint::content_fingerprint;
use crate::types::{NotificationFormat, ProcessorKind, WatchId};

/// One timestamped captured content version in a watch's history.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Extracted text content at capture time.
    pub contents: String,
    /// Hex fingerprint of the raw content, used for fast-skip comparisons.
    pub fingerprint: String,
}

/// Ordered, append-only history of snapshots keyed by unix seconds.
///
/// Keys are unique. Two snapshots collapsing to the same second would make
/// the "previous vs current" pair ambiguous, so an insert that collides
/// bumps the key forward to the next free second.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: BTreeMap<u64, Snapshot>,
}

impl History {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot keys in ascending order.
    pub fn keys(&self) -> Vec<u64> {
        self.entries.keys().copied().collect()
    }

    pub fn get(&self, timestamp: u64) -> Option<&Snapshot> {
        self.entries.get(&timestamp)
    }

    /// The most recent snapshot, if any.
    pub fn latest(&self) -> Option<(u64, &Snapshot)> {
        self.entries.iter().next_back().map(|(k, v)| (*k, v))
    }

    /// The two most recent snapshots as (previous, current).
    pub fn latest_two(&self) -> Option<(&Snapshot, &Snapshot)> {
        let mut iter = self.entries.iter().rev();
        let current = iter.next()?.1;
        let previous = iter.next()?.1;
        Some((previous, current))
    }

    /// Append a snapshot, bumping the key past any collision.
    /// Returns the key actually used.
    pub(crate) fn insert_unique(&mut self, timestamp: u64, snapshot: Snapshot) -> u64 {
        let mut key = timestamp;
        while self.entries.contains_key(&key) {
            key += 1;
        }
        self.entries.insert(key, snapshot);
        key
    }
}

/// Tri-state update for the `last_error` field: leave it alone (absent from
/// the [`WatchUpdate`]), clear it to healthy, or set an error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LastError {
    Healthy,
    Message(String),
}

/// A set of field updates applied to a watch in one atomic merge.
///
/// Fields left as `None` are untouched. This is the only way worker code
/// mutates a watch: build an update, hand it to
/// [`Datastore::update_watch`](crate::store::Datastore::update_watch).
#[derive(Debug, Clone, Default)]
pub struct WatchUpdate {
    pub last_error: Option<LastError>,
    pub consecutive_filter_failures: Option<u32>,
    /// `Some(None)` clears the marker; `Some(Some(n))` records the 1-based
    /// position of the failing browser step.
    pub browser_steps_last_error_step: Option<Option<u32>>,
    pub last_check_status: Option<u16>,
    /// `Some(None)` clears the cached "has price data" flag.
    pub has_price_data: Option<Option<bool>>,
    pub previous_checksum: Option<String>,
    pub fetch_time: Option<f64>,
    pub last_checked: Option<u64>,
    pub check_count: Option<u64>,
    pub notification_alert_count: Option<u64>,
    pub remote_server_reply: Option<String>,
}

/// A monitored target resource with its own history and settings.
///
/// Owned by the datastore; workers hold a cloned value only for the
/// duration of one check and write back through [`WatchUpdate`]s.
#[derive(Debug, Clone)]
pub struct Watch {
    pub id: WatchId,
    pub url: String,
    pub processor: ProcessorKind,

    // Per-watch notification overrides. Empty/`None` means "not set here";
    // the cascade resolver falls through to tags, then global settings.
    pub notification_urls: Vec<String>,
    pub notification_title: Option<String>,
    pub notification_body: Option<String>,
    pub notification_format: Option<NotificationFormat>,
    pub notification_muted: bool,
    /// Attach the latest screenshot to change notifications.
    pub notification_screenshot: bool,

    pub include_filters: Vec<String>,
    pub trigger_text: Vec<String>,
    /// Tag ids, in cascade resolution order.
    pub tags: Vec<String>,

    /// Opt-in for filter/step failure escalation notifications.
    pub filter_failure_notification_send: bool,
    /// When set, a successful check does not reset the filter-failure
    /// counter.
    pub ignore_status_codes: bool,

    pub consecutive_filter_failures: u32,
    pub check_count: u64,
    pub notification_alert_count: u64,

    /// Unix seconds of the last attempt; 0 = never checked.
    pub last_checked: u64,
    /// Elapsed seconds of the last fetch, rounded to milliseconds.
    pub fetch_time: f64,

    /// `None` = healthy; otherwise the persisted error text of the last
    /// failed attempt.
    pub last_error: Option<String>,
    pub last_check_status: Option<u16>,
    /// 1-based position of the last failing browser step, if any.
    pub browser_steps_last_error_step: Option<u32>,
    /// Cached flag for structured price data found on the page.
    pub has_price_data: Option<bool>,
    /// Fingerprint of the last saved content, for fast-skip comparisons.
    pub previous_checksum: Option<String>,
    /// Lowercased `server` response header of the last fetch, best-effort.
    pub remote_server_reply: Option<String>,

    pub history: History,
}

impl Watch {
    pub fn new(id: impl Into<WatchId>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            processor: ProcessorKind::default(),
            notification_urls: Vec::new(),
            notification_title: None,
            notification_body: None,
            notification_format: None,
            notification_muted: false,
            notification_screenshot: false,
            include_filters: Vec::new(),
            trigger_text: Vec::new(),
            tags: Vec::new(),
            filter_failure_notification_send: false,
            ignore_status_codes: false,
            consecutive_filter_failures: 0,
            check_count: 0,
            notification_alert_count: 0,
            last_checked: 0,
            fetch_time: 0.0,
            last_error: None,
            last_check_status: None,
            browser_steps_last_error_step: None,
            has_price_data: None,
            previous_checksum: None,
            remote_server_reply: None,
            history: History::default(),
        }
    }

    /// Merge a field update into this watch. Called by the datastore under
    /// its own lock so that concurrent updates interleave safely.
    pub fn apply(&mut self, update: WatchUpdate) {
        if let Some(last_error) = update.last_error {
            self.last_error = match last_error {
                LastError::Healthy => None,
                LastError::Message(msg) => Some(msg),
            };
        }
        if let Some(failures) = update.consecutive_filter_failures {
            self.consecutive_filter_failures = failures;
        }
        if let Some(step) = update.browser_steps_last_error_step {
            self.browser_steps_last_error_step = step;
        }
        if let Some(status) = update.last_check_status {
            self.last_check_status = Some(status);
        }
        if let Some(flag) = update.has_price_data {
            self.has_price_data = flag;
        }
        if let Some(checksum) = update.previous_checksum {
            self.previous_checksum = Some(checksum);
        }
        if let Some(fetch_time) = update.fetch_time {
            self.fetch_time = fetch_time;
        }
        if let Some(last_checked) = update.last_checked {
            self.last_checked = last_checked;
        }
        if let Some(count) = update.check_count {
            self.check_count = count;
        }
        if let Some(count) = update.notification_alert_count {
            self.notification_alert_count = count;
        }
        if let Some(reply) = update.remote_server_reply {
            self.remote_server_reply = Some(reply);
        }
    }

    /// Append a history snapshot. The fingerprint defaults to a fresh
    /// digest of `contents` when the caller did not carry one over from
    /// the check. Returns the key actually used.
    pub(crate) fn append_snapshot(
        &mut self,
        contents: &[u8],
        timestamp: u64,
        fingerprint: Option<&str>,
    ) -> u64 {
        let fingerprint = match fingerprint {
            Some(fp) => fp.to_string(),
            None => content_fingerprint(contents),
        };
        let snapshot = Snapshot {
            contents: String::from_utf8_lossy(contents).into_owned(),
            fingerprint,
        };
        self.history.insert_unique(timestamp, snapshot)
    }
}
