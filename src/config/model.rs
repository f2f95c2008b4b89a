// src/config/model.rs

//! Application settings: the global scope of the notification cascade plus
//! worker tuning.
//!
//! Settings are deserialized into [`RawSettings`] and validated into
//! [`AppSettings`] via `TryFrom`; the rest of the crate only ever sees the
//! validated form.

use serde::Deserialize;

use crate::types::NotificationFormat;

/// Default number of concurrent check workers.
pub const DEFAULT_WORKERS: usize = 10;

/// Default consecutive-failure count before a filter/step failure
/// notification is escalated. 0 disables escalation.
pub const DEFAULT_FILTER_FAILURE_THRESHOLD: u32 = 6;

/// Settings exactly as they appear in the TOML file, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSettings {
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default)]
    pub notification_urls: Vec<String>,
    #[serde(default)]
    pub notification_title: Option<String>,
    #[serde(default)]
    pub notification_body: Option<String>,
    #[serde(default)]
    pub notification_format: Option<NotificationFormat>,

    #[serde(default = "default_filter_failure_threshold")]
    pub filter_failure_notification_threshold_attempts: u32,
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_filter_failure_threshold() -> u32 {
    DEFAULT_FILTER_FAILURE_THRESHOLD
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            notification_urls: Vec::new(),
            notification_title: None,
            notification_body: None,
            notification_format: None,
            filter_failure_notification_threshold_attempts: DEFAULT_FILTER_FAILURE_THRESHOLD,
        }
    }
}

/// Validated application settings.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub workers: usize,
    pub notification_urls: Vec<String>,
    pub notification_title: Option<String>,
    pub notification_body: Option<String>,
    pub notification_format: Option<NotificationFormat>,
    pub filter_failure_notification_threshold_attempts: u32,
}

impl AppSettings {
    /// Bypass validation for settings constructed in code (tests,
    /// embedders building settings programmatically from known-good
    /// values).
    pub(crate) fn new_unchecked(raw: RawSettings) -> Self {
        Self {
            workers: raw.workers,
            notification_urls: raw.notification_urls,
            notification_title: raw.notification_title,
            notification_body: raw.notification_body,
            notification_format: raw.notification_format,
            filter_failure_notification_threshold_attempts: raw
                .filter_failure_notification_threshold_attempts,
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self::new_unchecked(RawSettings::default())
    }
}
