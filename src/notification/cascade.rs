// src/notification/cascade.rs

//! Cascading notification-settings lookup.
//!
//! Preference order: individual watch settings > tag settings > global
//! settings > built-in defaults. Each variable (urls, title, body, format)
//! resolves independently through the same ordered chain of sources, so
//! e.g. urls may come from the watch while the format comes from global
//! settings.
//!
//! A muted watch never contributes its own values; a muted tag is skipped
//! in favour of later tags or the global scope.

use crate::config::AppSettings;
use crate::model::{Tag, Watch};
use crate::types::NotificationFormat;

/// Default title template when nothing in the cascade sets one.
pub const DEFAULT_NOTIFICATION_TITLE: &str = "Pagewatch notification - {{watch_url}}";

/// Default body template when nothing in the cascade sets one.
pub const DEFAULT_NOTIFICATION_BODY: &str = "{{watch_url}} had a change.\n---\n{{diff}}\n---\n";

/// Resolves effective notification settings for one watch.
pub struct CascadeResolver<'a> {
    watch: &'a Watch,
    tags: &'a [Tag],
    settings: &'a AppSettings,
}

impl<'a> CascadeResolver<'a> {
    pub fn new(watch: &'a Watch, tags: &'a [Tag], settings: &'a AppSettings) -> Self {
        Self {
            watch,
            tags,
            settings,
        }
    }

    /// Walk the ordered sources and take the first that yields a value.
    fn first_of<T>(&self, sources: [Option<T>; 3]) -> Option<T> {
        sources.into_iter().flatten().next()
    }

    fn watch_level<T>(&self, value: Option<T>) -> Option<T> {
        if self.watch.notification_muted {
            None
        } else {
            value
        }
    }

    fn tag_level<T>(&self, value_of: impl Fn(&'a Tag) -> Option<T>) -> Option<T> {
        self.tags
            .iter()
            .filter(|tag| !tag.notification_muted)
            .find_map(value_of)
    }

    /// Effective notification urls; empty when nothing in the cascade sets
    /// any (there is no built-in default for urls).
    pub fn urls(&self) -> Vec<String> {
        self.first_of([
            self.watch_level(non_empty(&self.watch.notification_urls)),
            self.tag_level(|tag| non_empty(&tag.notification_urls)),
            non_empty(&self.settings.notification_urls),
        ])
        .unwrap_or_default()
    }

    pub fn title(&self) -> String {
        self.first_of([
            self.watch_level(non_blank(self.watch.notification_title.as_deref())),
            self.tag_level(|tag| non_blank(tag.notification_title.as_deref())),
            non_blank(self.settings.notification_title.as_deref()),
        ])
        .unwrap_or_else(|| DEFAULT_NOTIFICATION_TITLE.to_string())
    }

    pub fn body(&self) -> String {
        self.first_of([
            self.watch_level(non_blank(self.watch.notification_body.as_deref())),
            self.tag_level(|tag| non_blank(tag.notification_body.as_deref())),
            non_blank(self.settings.notification_body.as_deref()),
        ])
        .unwrap_or_else(|| DEFAULT_NOTIFICATION_BODY.to_string())
    }

    pub fn format(&self) -> NotificationFormat {
        self.first_of([
            self.watch_level(self.watch.notification_format),
            self.tag_level(|tag| tag.notification_format),
            self.settings.notification_format,
        ])
        .unwrap_or_default()
    }
}

fn non_empty(urls: &[String]) -> Option<Vec<String>> {
    if urls.is_empty() {
        None
    } else {
        Some(urls.to_vec())
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
}
