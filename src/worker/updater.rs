// src/worker/updater.rs

//! Applies the outcome of a check attempt to persistent watch state.
//!
//! Two entry points, both called by the worker:
//!
//! - [`commit_check_result`] runs only when the attempt produced usable
//!   results (success path): persists the field updates, advances history,
//!   and conditionally notifies.
//! - [`record_attempt`] runs after *every* attempt, success or failure:
//!   attempt counter, timing, server header, latest fetch artifacts.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::model::{unix_now, LastError, WatchUpdate};
use crate::notification::Notifier;
use crate::processor::FetchArtifacts;
use crate::store::Datastore;

/// Longest `server` header value worth keeping.
const SERVER_HEADER_MAX_LEN: usize = 255;

/// Persist a successful check: apply the processor's field updates,
/// append a history snapshot when warranted, and notify on a confirmed
/// change.
///
/// Any failure inside this path is caught here: losing one watch's
/// refresh must never take down the worker, so the error is logged at
/// critical severity and recorded on the watch instead of propagating.
pub fn commit_check_result<D: Datastore>(
    store: &D,
    notifier: &Notifier<D>,
    watch_id: &str,
    changed: bool,
    update: WatchUpdate,
    contents: &[u8],
) {
    if let Err(e) = commit_inner(store, notifier, watch_id, changed, update, contents) {
        error!(
            watch = %watch_id,
            error = %e,
            "failed applying check results; recording error on watch"
        );
        if let Err(e) = store.update_watch(
            watch_id,
            WatchUpdate {
                last_error: Some(LastError::Message(e.to_string())),
                ..WatchUpdate::default()
            },
        ) {
            error!(watch = %watch_id, error = %e, "could not even record the failure");
        }
    }
}

fn commit_inner<D: Datastore>(
    store: &D,
    notifier: &Notifier<D>,
    watch_id: &str,
    changed: bool,
    update: WatchUpdate,
    contents: &[u8],
) -> anyhow::Result<()> {
    // The watch may have been deleted while the fetch was in flight.
    let Some(watch) = store.get_watch(watch_id) else {
        return Ok(());
    };

    let previous_checksum = update.previous_checksum.clone();
    store.update_watch(watch_id, update)?;

    // Also save the snapshot on the first-ever successful check: the
    // baseline. Failures never advance history, so "first ever" is simply
    // an empty history.
    let first_check = watch.history.is_empty();
    if changed || first_check {
        store.save_history_snapshot(
            watch_id,
            contents,
            unix_now(),
            previous_checksum.as_deref(),
        )?;
    }

    if changed {
        let Some(watch) = store.get_watch(watch_id) else {
            return Ok(());
        };
        // Notifications only fire from the second snapshot onwards; the
        // first successful check merely establishes the baseline.
        if watch.history.len() >= 2 {
            info!(watch = %watch_id, url = %watch.url, "change detected");
            if !watch.notification_muted {
                notifier.send_content_changed_notification(watch_id)?;
            }
        } else {
            info!(
                watch = %watch_id,
                url = %watch.url,
                "change recorded on first history save; no notification sent"
            );
        }
    }

    Ok(())
}

/// Per-attempt bookkeeping, run regardless of outcome.
///
/// Records that we at least tried: attempt counter, fetch timing, last
/// checked timestamp, the server identification header (best-effort), and
/// the latest fetch artifacts if the processor produced any.
pub fn record_attempt<D: Datastore>(
    store: &D,
    watch_id: &str,
    fetch: &FetchArtifacts,
    elapsed: Duration,
) {
    let Some(watch) = store.get_watch(watch_id) else {
        return;
    };

    let mut update = WatchUpdate {
        fetch_time: Some(round_millis(elapsed.as_secs_f64())),
        last_checked: Some(unix_now()),
        check_count: Some(watch.check_count + 1),
        ..WatchUpdate::default()
    };

    // Server header reply can drive fetch workarounds later; losing it is
    // never worth failing the attempt over.
    if let Some(server) = fetch.headers.get("server") {
        let reply: String = server
            .trim()
            .to_lowercase()
            .chars()
            .take(SERVER_HEADER_MAX_LEN)
            .collect();
        update.remote_server_reply = Some(reply);
    }

    if let Err(e) = store.update_watch(watch_id, update) {
        warn!(watch = %watch_id, error = %e, "failed recording attempt bookkeeping");
    }

    // Latest artifacts are saved independent of the change/no-change
    // outcome.
    if let Some(bytes) = &fetch.screenshot {
        if let Err(e) = store.save_screenshot(watch_id, bytes, false) {
            warn!(watch = %watch_id, error = %e, "failed saving screenshot");
        }
    }
    if let Some(data) = &fetch.xpath_data {
        if let Err(e) = store.save_xpath_data(watch_id, data, false) {
            warn!(watch = %watch_id, error = %e, "failed saving xpath data");
        }
    }
}

fn round_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}
