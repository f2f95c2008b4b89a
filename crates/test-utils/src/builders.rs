#![allow(dead_code)]

use pagewatch::config::AppSettings;
use pagewatch::model::{Tag, Watch};
use pagewatch::types::{NotificationFormat, ProcessorKind};

/// Builder for `Watch` to simplify test setup.
pub struct WatchBuilder {
    watch: Watch,
}

impl WatchBuilder {
    pub fn new(id: &str, url: &str) -> Self {
        Self {
            watch: Watch::new(id, url),
        }
    }

    pub fn processor(mut self, kind: ProcessorKind) -> Self {
        self.watch.processor = kind;
        self
    }

    pub fn notification_urls(mut self, urls: &[&str]) -> Self {
        self.watch.notification_urls = urls.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn notification_title(mut self, title: &str) -> Self {
        self.watch.notification_title = Some(title.to_string());
        self
    }

    pub fn notification_body(mut self, body: &str) -> Self {
        self.watch.notification_body = Some(body.to_string());
        self
    }

    pub fn notification_format(mut self, format: NotificationFormat) -> Self {
        self.watch.notification_format = Some(format);
        self
    }

    pub fn muted(mut self) -> Self {
        self.watch.notification_muted = true;
        self
    }

    pub fn notification_screenshot(mut self, enabled: bool) -> Self {
        self.watch.notification_screenshot = enabled;
        self
    }

    pub fn include_filters(mut self, filters: &[&str]) -> Self {
        self.watch.include_filters = filters.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn trigger_text(mut self, triggers: &[&str]) -> Self {
        self.watch.trigger_text = triggers.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn tags(mut self, tag_ids: &[&str]) -> Self {
        self.watch.tags = tag_ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn filter_failure_notification_send(mut self, enabled: bool) -> Self {
        self.watch.filter_failure_notification_send = enabled;
        self
    }

    pub fn ignore_status_codes(mut self, enabled: bool) -> Self {
        self.watch.ignore_status_codes = enabled;
        self
    }

    pub fn consecutive_filter_failures(mut self, count: u32) -> Self {
        self.watch.consecutive_filter_failures = count;
        self
    }

    pub fn build(self) -> Watch {
        self.watch
    }
}

/// Builder for `Tag`.
pub struct TagBuilder {
    tag: Tag,
}

impl TagBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            tag: Tag::new(id, id),
        }
    }

    pub fn notification_urls(mut self, urls: &[&str]) -> Self {
        self.tag.notification_urls = urls.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn notification_title(mut self, title: &str) -> Self {
        self.tag.notification_title = Some(title.to_string());
        self
    }

    pub fn notification_body(mut self, body: &str) -> Self {
        self.tag.notification_body = Some(body.to_string());
        self
    }

    pub fn notification_format(mut self, format: NotificationFormat) -> Self {
        self.tag.notification_format = Some(format);
        self
    }

    pub fn muted(mut self) -> Self {
        self.tag.notification_muted = true;
        self
    }

    pub fn build(self) -> Tag {
        self.tag
    }
}

/// Builder for `AppSettings`.
pub struct SettingsBuilder {
    settings: AppSettings,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self {
            settings: AppSettings::default(),
        }
    }

    pub fn workers(mut self, count: usize) -> Self {
        self.settings.workers = count;
        self
    }

    pub fn notification_urls(mut self, urls: &[&str]) -> Self {
        self.settings.notification_urls = urls.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn notification_title(mut self, title: &str) -> Self {
        self.settings.notification_title = Some(title.to_string());
        self
    }

    pub fn notification_body(mut self, body: &str) -> Self {
        self.settings.notification_body = Some(body.to_string());
        self
    }

    pub fn notification_format(mut self, format: NotificationFormat) -> Self {
        self.settings.notification_format = Some(format);
        self
    }

    pub fn filter_failure_threshold(mut self, attempts: u32) -> Self {
        self.settings.filter_failure_notification_threshold_attempts = attempts;
        self
    }

    pub fn build(self) -> AppSettings {
        self.settings
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
