// src/notification/payload.rs

//! Change-notification payload rendering: diff variants, current snapshot
//! text, and trigger-text extraction.

use regex::Regex;
use tracing::debug;

use crate::diff::{render_diff, DiffOptions};
use crate::model::{unix_now, Watch};
use crate::notification::{DiffPayload, Notification, NotificationError};
use crate::types::NotificationFormat;

// Illustrative snapshot pair used when a watch has fewer than two history
// entries (e.g. a test notification fired right after the first check).
const EXAMPLE_PREVIOUS: &str = "Example text: example test\n\
    Example text: change detection is cool\n\
    Example text: some more examples\n";
const EXAMPLE_CURRENT: &str = "Example text: example test\n\
    Example text: change detection is fantastic\n\
    Example text: even more examples\n\
    Example text: a lot more examples";

/// Build a fully rendered change notification for a watch.
///
/// Requires at least one history snapshot (the current one); with fewer
/// than two, the diff falls back to a fixed example pair so previews still
/// show something meaningful. The caller supplies the already-resolved
/// cascade values and the optional screenshot.
pub fn build_change_notification(
    watch: &Watch,
    urls: Vec<String>,
    title: String,
    body: String,
    format: NotificationFormat,
    screenshot: Option<Vec<u8>>,
) -> Result<Notification, NotificationError> {
    let Some((_, latest)) = watch.history.latest() else {
        return Err(NotificationError::InsufficientHistory);
    };

    let sep = format.line_feed_sep();

    // Snapshots are stored as plain text; HTML payloads need explicit
    // line breaks.
    let mut current_snapshot = latest.contents.clone();
    if format == NotificationFormat::Html {
        current_snapshot = current_snapshot.replace('\n', sep);
    }

    let triggered_text = if watch.trigger_text.is_empty() {
        None
    } else {
        let lines = triggered_lines(&latest.contents, &watch.trigger_text);
        if lines.is_empty() {
            None
        } else {
            Some(lines.join(sep))
        }
    };

    let (previous, current) = match watch.history.latest_two() {
        Some((prev, curr)) => (prev.contents.clone(), curr.contents.clone()),
        None => (EXAMPLE_PREVIOUS.to_string(), EXAMPLE_CURRENT.to_string()),
    };

    let diff = DiffPayload {
        diff: render_diff(
            &previous,
            &current,
            &DiffOptions {
                line_feed_sep: sep,
                ..DiffOptions::default()
            },
        ),
        diff_added: render_diff(
            &previous,
            &current,
            &DiffOptions {
                include_removed: false,
                line_feed_sep: sep,
                ..DiffOptions::default()
            },
        ),
        diff_removed: render_diff(
            &previous,
            &current,
            &DiffOptions {
                include_added: false,
                line_feed_sep: sep,
                ..DiffOptions::default()
            },
        ),
        diff_full: render_diff(
            &previous,
            &current,
            &DiffOptions {
                include_equal: true,
                line_feed_sep: sep,
                ..DiffOptions::default()
            },
        ),
        diff_patch: render_diff(
            &previous,
            &current,
            &DiffOptions {
                patch_format: true,
                line_feed_sep: sep,
                ..DiffOptions::default()
            },
        ),
    };

    Ok(Notification {
        urls,
        title,
        body,
        format,
        watch_id: Some(watch.id.clone()),
        watch_url: Some(watch.url.clone()),
        current_snapshot: Some(current_snapshot),
        diff: Some(diff),
        triggered_text,
        screenshot,
        timestamp: unix_now(),
    })
}

/// Extract the lines of `content` matching any trigger pattern.
///
/// A pattern wrapped in `/.../` is treated as a case-insensitive regular
/// expression; anything else is a case-insensitive substring match. An
/// unparseable regex degrades to substring matching on its raw text.
pub fn triggered_lines(content: &str, triggers: &[String]) -> Vec<String> {
    enum Matcher {
        Pattern(Regex),
        Substring(String),
    }

    let matchers: Vec<Matcher> = triggers
        .iter()
        .map(|trigger| {
            let trigger = trigger.trim();
            if trigger.len() > 2 && trigger.starts_with('/') && trigger.ends_with('/') {
                let inner = &trigger[1..trigger.len() - 1];
                match Regex::new(&format!("(?i){inner}")) {
                    Ok(re) => return Matcher::Pattern(re),
                    Err(e) => {
                        debug!(trigger = %trigger, error = %e, "invalid trigger regex; matching as substring");
                    }
                }
            }
            Matcher::Substring(trigger.to_lowercase())
        })
        .collect();

    content
        .lines()
        .filter(|line| {
            matchers.iter().any(|m| match m {
                Matcher::Pattern(re) => re.is_match(line),
                Matcher::Substring(needle) => line.to_lowercase().contains(needle),
            })
        })
        .map(|line| line.to_string())
        .collect()
}
