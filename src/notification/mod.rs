// src/notification/mod.rs

//! Notification objects, the outbound queue boundary, and the high-level
//! senders driven by the check workers.
//!
//! Notifications are ephemeral: built per event, handed to the outbound
//! delivery queue (an external collaborator consumes it), and discarded.
//! The cascade that decides *where* and *how* to notify lives in
//! [`cascade`]; the payload rendering (diff variants, trigger text) lives
//! in [`payload`].

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::model::{unix_now, WatchUpdate};
use crate::store::Datastore;
use crate::types::{NotificationFormat, WatchId};

pub mod cascade;
pub mod payload;

pub use cascade::{CascadeResolver, DEFAULT_NOTIFICATION_BODY, DEFAULT_NOTIFICATION_TITLE};
pub use payload::build_change_notification;

/// The five rendered diff variants carried by a change notification.
#[derive(Debug, Clone)]
pub struct DiffPayload {
    /// Additions, removals and replacements.
    pub diff: String,
    /// Additions (and replacements) only.
    pub diff_added: String,
    /// Removals (and replacements) only.
    pub diff_removed: String,
    /// Full listing including unchanged lines.
    pub diff_full: String,
    /// Unified patch format.
    pub diff_patch: String,
}

/// One outbound notification event.
#[derive(Debug, Clone)]
pub struct Notification {
    pub urls: Vec<String>,
    pub title: String,
    pub body: String,
    pub format: NotificationFormat,
    pub watch_id: Option<WatchId>,
    pub watch_url: Option<String>,
    /// Latest snapshot text (line breaks converted for HTML payloads).
    pub current_snapshot: Option<String>,
    /// Present on change notifications; escalations carry no diff.
    pub diff: Option<DiffPayload>,
    /// Lines matching the watch's trigger-text filters, if any.
    pub triggered_text: Option<String>,
    pub screenshot: Option<Vec<u8>>,
    pub timestamp: u64,
}

/// Sending half of the outbound notification queue. Delivery and retry are
/// entirely external; the worker side only ever enqueues.
pub type NotificationSender = mpsc::UnboundedSender<Notification>;

/// Receiving half, consumed by the external delivery process.
pub type NotificationReceiver = mpsc::UnboundedReceiver<Notification>;

/// Create the outbound notification queue pair.
pub fn notification_channel() -> (NotificationSender, NotificationReceiver) {
    mpsc::unbounded_channel()
}

#[derive(Error, Debug)]
pub enum NotificationError {
    /// A change notification needs at least the current snapshot in
    /// history (and two snapshots to diff for real).
    #[error("watch has insufficient history to build a notification")]
    InsufficientHistory,

    /// The outbound queue receiver is gone.
    #[error("outbound notification queue is closed")]
    QueueClosed,
}

/// Builds and enqueues notifications for watches.
pub struct Notifier<D> {
    store: Arc<D>,
    queue: NotificationSender,
}

impl<D: Datastore> Notifier<D> {
    pub fn new(store: Arc<D>, queue: NotificationSender) -> Self {
        Self { store, queue }
    }

    /// Send a "content changed" notification for a watch.
    ///
    /// Resolves urls/title/body/format through the cascade; returns
    /// whether a notification was actually queued (false when no urls
    /// resolved or the watch vanished). On queueing, increments the
    /// watch's `notification_alert_count` exactly once.
    pub fn send_content_changed_notification(
        &self,
        watch_id: &str,
    ) -> Result<bool, NotificationError> {
        let Some(watch) = self.store.get_watch(watch_id) else {
            return Ok(false);
        };

        // Two or more snapshots are required to diff; exactly one here
        // means the second check never landed (or history keys collided).
        if watch.history.len() < 2 {
            return Err(NotificationError::InsufficientHistory);
        }

        let tags = self.store.tags_for_watch(watch_id);
        let settings = self.store.settings();
        let resolver = CascadeResolver::new(&watch, &tags, &settings);

        let urls = resolver.urls();
        if urls.is_empty() {
            debug!(watch = %watch_id, "no notification urls resolved; not queueing");
            return Ok(false);
        }

        let count = watch.notification_alert_count + 1;
        if let Err(e) = self.store.update_watch(
            watch_id,
            WatchUpdate {
                notification_alert_count: Some(count),
                ..WatchUpdate::default()
            },
        ) {
            warn!(watch = %watch_id, error = %e, "failed to bump notification alert count");
        }

        let screenshot = if watch.notification_screenshot {
            self.store.get_screenshot(watch_id)
        } else {
            None
        };

        let notification = build_change_notification(
            &watch,
            urls,
            resolver.title(),
            resolver.body(),
            resolver.format(),
            screenshot,
        )?;

        self.queue
            .send(notification)
            .map_err(|_| NotificationError::QueueClosed)?;
        debug!(watch = %watch_id, "queued change notification for sending");
        Ok(true)
    }

    /// Escalation: a configured CSS/xPath filter kept missing from the
    /// page. Urls resolve from watch-level overrides else global settings
    /// only; tags are not consulted for escalations.
    pub fn send_filter_failure_notification(&self, watch_id: &str) {
        let Some(watch) = self.store.get_watch(watch_id) else {
            return;
        };
        let settings = self.store.settings();
        let threshold = settings.filter_failure_notification_threshold_attempts;

        let title = "Pagewatch - Alert - CSS/xPath filter was not present in the page".to_string();
        let body = format!(
            "Your configured CSS/xPath filters of '{}' for {{{{watch_url}}}} did not appear on \
             the page after {} attempts, did the page change layout?\n\n\
             Link: {{{{base_url}}}}/edit/{{{{watch_id}}}}\n",
            watch.include_filters.join(", "),
            threshold,
        );

        let Some(urls) = escalation_urls(&watch.notification_urls, &settings.notification_urls)
        else {
            return;
        };

        let notification = Notification {
            urls,
            title,
            body,
            format: NotificationFormat::Text,
            watch_id: Some(watch.id.clone()),
            watch_url: Some(watch.url.clone()),
            current_snapshot: None,
            diff: None,
            triggered_text: None,
            screenshot: None,
            timestamp: unix_now(),
        };

        if self.queue.send(notification).is_ok() {
            warn!(watch = %watch_id, "sent filter-not-found notification");
        }
    }

    /// Escalation: a browser automation step kept failing. Same url
    /// resolution rules as the filter-failure escalation. `step_index` is
    /// 0-based; the rendered position is 1-based.
    pub fn send_step_failure_notification(&self, watch_id: &str, step_index: u32) {
        let Some(watch) = self.store.get_watch(watch_id) else {
            return;
        };
        let settings = self.store.settings();
        let threshold = settings.filter_failure_notification_threshold_attempts;
        let position = step_index + 1;

        let title = format!(
            "Pagewatch - Alert - Browser step at position {position} could not be run"
        );
        let body = format!(
            "Your configured browser step at position {position} for {{{{watch_url}}}} did not \
             appear on the page after {threshold} attempts, did the page change layout? Does it \
             need a delay added?\n\n\
             Link: {{{{base_url}}}}/edit/{{{{watch_id}}}}\n"
        );

        let Some(urls) = escalation_urls(&watch.notification_urls, &settings.notification_urls)
        else {
            return;
        };

        let notification = Notification {
            urls,
            title,
            body,
            format: NotificationFormat::Text,
            watch_id: Some(watch.id.clone()),
            watch_url: Some(watch.url.clone()),
            current_snapshot: None,
            diff: None,
            triggered_text: None,
            screenshot: None,
            timestamp: unix_now(),
        };

        if self.queue.send(notification).is_ok() {
            warn!(watch = %watch_id, step = position, "sent step failure notification");
        }
    }
}

/// Watch-level urls, else global, else nothing to send to.
fn escalation_urls(watch_urls: &[String], global_urls: &[String]) -> Option<Vec<String>> {
    if !watch_urls.is_empty() {
        Some(watch_urls.to_vec())
    } else if !global_urls.is_empty() {
        Some(global_urls.to_vec())
    } else {
        None
    }
}
