// src/model/tag.rs

use crate::types::NotificationFormat;

/// A named group of watches, carrying its own optional notification
/// overrides. Sits between watch-level and global settings in the cascade.
#[derive(Debug, Clone)]
pub struct Tag {
    pub id: String,
    pub title: String,
    pub notification_urls: Vec<String>,
    pub notification_title: Option<String>,
    pub notification_body: Option<String>,
    pub notification_format: Option<NotificationFormat>,
    pub notification_muted: bool,
}

impl Tag {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            notification_urls: Vec::new(),
            notification_title: None,
            notification_body: None,
            notification_format: None,
            notification_muted: false,
        }
    }
}
