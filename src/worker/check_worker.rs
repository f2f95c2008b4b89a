// src/worker/check_worker.rs

//! The long-lived check worker.
//!
//! Each worker independently pulls jobs from the shared [`CheckQueue`],
//! runs the watch's configured processor, routes failures through the
//! classifier, applies state updates, and drives the notification
//! pipeline. Any number of workers may run against the same queue; none
//! holds a lock across the fetch, which is the only long-latency step per
//! iteration.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::errors::CheckFailure;
use crate::model::{LastError, WatchUpdate};
use crate::notification::{NotificationSender, Notifier};
use crate::processor::ProcessorFactory;
use crate::store::Datastore;
use crate::types::WatchId;
use crate::worker::classifier::{classify, ArtifactSave, EscalationKind};
use crate::worker::queue::{CheckJob, CheckQueue};
use crate::worker::updater::{commit_check_result, record_attempt};

/// How long a worker waits on the shutdown signal when the queue is empty
/// before polling again.
const EMPTY_QUEUE_WAIT: Duration = Duration::from_secs(1);

/// Short pause after each processed item to keep the host responsive.
const ITEM_PAUSE: Duration = Duration::from_millis(100);

/// Process-wide shutdown signalling.
///
/// The sender side flips the flag once; every worker holds a clone of the
/// receiver and polls it between iterations (an attempt already in
/// progress runs to completion).
pub fn shutdown_channel() -> (ShutdownHandle, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx }, ShutdownSignal { rx })
}

#[derive(Debug)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn is_set(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the signal fires or `duration` elapses, whichever comes
    /// first. This is the worker's suspension point on an empty queue.
    pub async fn wait_timeout(&mut self, duration: Duration) {
        let _ = tokio::time::timeout(duration, self.rx.wait_for(|set| *set)).await;
    }
}

/// Clears the "currently processing" slot when the iteration scope ends,
/// on every exit path.
struct CurrentWatchGuard<'a> {
    slot: &'a Mutex<Option<WatchId>>,
}

impl<'a> CurrentWatchGuard<'a> {
    fn set(slot: &'a Mutex<Option<WatchId>>, watch_id: &str) -> Self {
        *slot.lock().expect("current watch slot poisoned") = Some(watch_id.to_string());
        Self { slot }
    }
}

impl Drop for CurrentWatchGuard<'_> {
    fn drop(&mut self) {
        *self.slot.lock().expect("current watch slot poisoned") = None;
    }
}

/// A single check worker instance.
pub struct CheckWorker<D> {
    id: usize,
    queue: Arc<CheckQueue>,
    store: Arc<D>,
    processors: Arc<dyn ProcessorFactory>,
    notifier: Notifier<D>,
    shutdown: ShutdownSignal,
    /// Observability only: which watch this worker is on right now.
    current: Arc<Mutex<Option<WatchId>>>,
}

impl<D: Datastore> CheckWorker<D> {
    pub fn new(
        id: usize,
        queue: Arc<CheckQueue>,
        store: Arc<D>,
        processors: Arc<dyn ProcessorFactory>,
        notifications: NotificationSender,
        shutdown: ShutdownSignal,
    ) -> Self {
        let notifier = Notifier::new(Arc::clone(&store), notifications);
        Self {
            id,
            queue,
            store,
            processors,
            notifier,
            shutdown,
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// Shared handle to the "currently processing" slot; stays valid after
    /// the worker moves into its task.
    pub fn current_watch(&self) -> Arc<Mutex<Option<WatchId>>> {
        Arc::clone(&self.current)
    }

    /// Main loop. Exits when the shutdown signal is set and no job is in
    /// flight on this worker.
    pub async fn run(mut self) {
        info!(worker = self.id, "check worker started");

        while !self.shutdown.is_set() {
            let Some(job) = self.queue.try_pop() else {
                // Nothing ready: park on the shutdown signal for a bounded
                // interval rather than busy-spinning.
                self.shutdown.wait_timeout(EMPTY_QUEUE_WAIT).await;
                continue;
            };

            {
                let _current = CurrentWatchGuard::set(&self.current, &job.watch_id);
                self.process_job(&job).await;
            }

            // Always acknowledge, whatever happened above, so the queue
            // accounting stays correct.
            self.queue.task_done();

            tokio::time::sleep(ITEM_PAUSE).await;
        }

        info!(worker = self.id, "check worker exiting");
    }

    async fn process_job(&self, job: &CheckJob) {
        let watch_id = job.watch_id.as_str();

        // The watch may have been removed or edited since the job was
        // queued; that is not an error.
        let Some(watch) = self.store.get_watch(watch_id) else {
            debug!(worker = self.id, watch = %watch_id, "watch no longer exists; discarding job");
            return;
        };
        if watch.url.trim().is_empty() {
            debug!(worker = self.id, watch = %watch_id, "watch has no target configured; discarding job");
            return;
        }

        info!(
            worker = self.id,
            watch = %watch_id,
            priority = job.priority,
            url = %watch.url,
            "processing watch"
        );
        let started = Instant::now();

        // Preflight: clear the stale browser-step error marker.
        self.try_update(
            watch_id,
            WatchUpdate {
                browser_steps_last_error_step: Some(None),
                ..WatchUpdate::default()
            },
        );

        let mut processor = self.processors.make(watch.processor);
        let report = processor
            .perform_check(&watch, job.skip_when_checksum_same)
            .await;

        match report.outcome {
            Ok(success) => {
                // Crash protection: the watch entry could have been removed
                // during a slow fetch.
                if self.store.get_watch(watch_id).is_none() {
                    debug!(watch = %watch_id, "watch removed during check; dropping results");
                    return;
                }

                let mut update = success.update;
                // Mark that we never had any failures.
                if !watch.ignore_status_codes {
                    update.consecutive_filter_failures = Some(0);
                }
                // Everything ran OK, clean off any previous error.
                update.last_error = Some(LastError::Healthy);

                if let Err(e) = self.store.cleanup_error_artifacts(watch_id) {
                    warn!(watch = %watch_id, error = %e, "failed cleaning error artifacts");
                }

                commit_check_result(
                    self.store.as_ref(),
                    &self.notifier,
                    watch_id,
                    success.changed,
                    update,
                    &success.contents,
                );
            }
            Err(failure) => self.handle_failure(watch_id, failure),
        }

        record_attempt(self.store.as_ref(), watch_id, &report.fetch, started.elapsed());

        debug!(
            worker = self.id,
            watch = %watch_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "watch check finished"
        );
    }

    /// Route a failed attempt through the classifier and apply its recipe.
    fn handle_failure(&self, watch_id: &str, failure: CheckFailure) {
        if let CheckFailure::PermissionDenied(detail) = &failure {
            // Worst kind of local failure; nothing sensible to persist.
            error!(watch = %watch_id, error = %detail, "file permission error updating watch state");
        } else if matches!(failure, CheckFailure::ChecksumUnchanged) {
            debug!(watch = %watch_id, "checksum unchanged; skipping further processing");
        } else {
            warn!(watch = %watch_id, failure = %failure, "check attempt failed");
        }

        // The watch can disappear while the failing fetch was in flight.
        if self.store.get_watch(watch_id).is_none() {
            return;
        }

        let recipe = classify(failure);

        for artifact in recipe.artifacts {
            let result = match artifact {
                ArtifactSave::Screenshot { bytes, as_error } => {
                    self.store.save_screenshot(watch_id, &bytes, as_error)
                }
                ArtifactSave::XpathData { data, as_error } => {
                    self.store.save_xpath_data(watch_id, &data, as_error)
                }
                ArtifactSave::ErrorText { contents } => {
                    self.store.save_error_text(watch_id, &contents)
                }
            };
            if let Err(e) = result {
                warn!(watch = %watch_id, error = %e, "failed saving failure artifact");
            }
        }

        self.try_update(watch_id, recipe.update);

        if let Some(kind) = recipe.escalation {
            self.apply_escalation(watch_id, kind);
        }
    }

    /// Consecutive-failure escalation shared by the filter-not-found and
    /// browser-step failure paths: opt-in per watch, threshold from global
    /// settings, counter reset once the notification fires (muted watches
    /// still reset so they don't alert immediately on unmute).
    fn apply_escalation(&self, watch_id: &str, kind: EscalationKind) {
        let Some(watch) = self.store.get_watch(watch_id) else {
            return;
        };
        if !watch.filter_failure_notification_send {
            return;
        }

        let mut failures = watch.consecutive_filter_failures + 1;
        let threshold = self
            .store
            .settings()
            .filter_failure_notification_threshold_attempts;

        match kind {
            EscalationKind::FilterFailure => {
                warn!(watch = %watch_id, consecutive_filter_failures = failures, "filter not found");
            }
            EscalationKind::StepFailure { step_index } => {
                warn!(
                    watch = %watch_id,
                    step = step_index + 1,
                    consecutive_filter_failures = failures,
                    "browser step not found"
                );
            }
        }

        if threshold > 0 && failures >= threshold {
            if !watch.notification_muted {
                match kind {
                    EscalationKind::FilterFailure => {
                        self.notifier.send_filter_failure_notification(watch_id);
                    }
                    EscalationKind::StepFailure { step_index } => {
                        self.notifier
                            .send_step_failure_notification(watch_id, step_index);
                    }
                }
            }
            failures = 0;
        }

        self.try_update(
            watch_id,
            WatchUpdate {
                consecutive_filter_failures: Some(failures),
                ..WatchUpdate::default()
            },
        );
    }

    /// Fire-and-forget update; a failed write is logged, never propagated.
    fn try_update(&self, watch_id: &str, update: WatchUpdate) {
        if let Err(e) = self.store.update_watch(watch_id, update) {
            warn!(watch = %watch_id, error = %e, "watch update failed");
        }
    }
}
