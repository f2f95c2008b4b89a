// src/types.rs

use std::str::FromStr;

use serde::Deserialize;

/// Canonical watch identifier type used throughout the crate.
pub type WatchId = String;

/// Which change-detection strategy a watch uses.
///
/// - `TextJsonDiff`: default text/structural diff over the extracted page
///   content (also used when a watch carries no explicit processor).
/// - `RestockDiff`: restock/availability detection for product pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorKind {
    TextJsonDiff,
    RestockDiff,
}

impl Default for ProcessorKind {
    fn default() -> Self {
        ProcessorKind::TextJsonDiff
    }
}

impl FromStr for ProcessorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text_json_diff" => Ok(ProcessorKind::TextJsonDiff),
            "restock_diff" => Ok(ProcessorKind::RestockDiff),
            other => Err(format!(
                "invalid processor kind: {other} (expected \"text_json_diff\" or \"restock_diff\")"
            )),
        }
    }
}

/// Rendering format for outbound notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationFormat {
    Text,
    Markdown,
    Html,
}

impl Default for NotificationFormat {
    fn default() -> Self {
        NotificationFormat::Text
    }
}

impl NotificationFormat {
    /// Line separator used when joining rendered notification lines.
    ///
    /// HTML needs a line break tag; Markdown and Text can use a line feed.
    pub fn line_feed_sep(self) -> &'static str {
        match self {
            NotificationFormat::Html => "<br>",
            _ => "\n",
        }
    }
}

impl FromStr for NotificationFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(NotificationFormat::Text),
            "markdown" => Ok(NotificationFormat::Markdown),
            "html" => Ok(NotificationFormat::Html),
            other => Err(format!(
                "invalid notification format: {other} (expected \"text\", \"markdown\" or \"html\")"
            )),
        }
    }
}
