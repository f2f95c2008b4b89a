// tests/notification_payload.rs

//! Notification payload building: diff variants, separators, trigger
//! text, the alert counter, and the escalation builders' url rules.

use std::sync::Arc;

use pagewatch::notification::{
    build_change_notification, notification_channel, NotificationError, Notifier,
};
use pagewatch::store::{Datastore, MemoryDatastore};
use pagewatch::types::NotificationFormat;

use pagewatch_test_utils::builders::{SettingsBuilder, TagBuilder, WatchBuilder};
use pagewatch_test_utils::init_tracing;

fn store_with(settings: pagewatch::AppSettings) -> (Arc<MemoryDatastore>, tempfile::TempDir) {
    init_tracing();
    let tmp = tempfile::tempdir().expect("tempdir");
    (Arc::new(MemoryDatastore::new(settings, tmp.path())), tmp)
}

#[test]
fn change_notification_carries_all_diff_variants() {
    let (store, _tmp) = store_with(SettingsBuilder::new().build());
    store.add_watch(
        WatchBuilder::new("w1", "https://example.test")
            .notification_urls(&["post://alerts.example"])
            .build(),
    );
    store
        .save_history_snapshot("w1", b"kept line\nold line", 1_000, None)
        .expect("seed");
    store
        .save_history_snapshot("w1", b"kept line\nnew line", 2_000, None)
        .expect("seed");

    let (tx, mut rx) = notification_channel();
    let notifier = Notifier::new(Arc::clone(&store), tx);

    let queued = notifier
        .send_content_changed_notification("w1")
        .expect("notification built");
    assert!(queued);

    let n = rx.try_recv().expect("queued");
    let diff = n.diff.expect("diff payload present");
    assert!(diff.diff.contains("(changed) old line"), "diff: {}", diff.diff);
    assert!(diff.diff.contains("(into) new line"));
    assert!(!diff.diff.contains("kept line"), "unchanged lines excluded by default");
    assert!(diff.diff_full.contains("kept line"), "full variant keeps context");
    assert!(!diff.diff_added.contains("(removed)"));
    assert!(!diff.diff_removed.contains("(added)"));
    assert!(diff.diff_patch.starts_with("---"), "patch: {}", diff.diff_patch);
    assert!(diff.diff_patch.contains("@@"));
    assert_eq!(n.current_snapshot.as_deref(), Some("kept line\nnew line"));
    assert!(n.timestamp > 0);

    let watch = store.get_watch("w1").expect("watch");
    assert_eq!(watch.notification_alert_count, 1, "alert counter bumped once");
}

#[test]
fn no_resolved_urls_means_nothing_queued() {
    let (store, _tmp) = store_with(SettingsBuilder::new().build());
    store.add_watch(WatchBuilder::new("w1", "https://example.test").build());
    store.save_history_snapshot("w1", b"a", 1_000, None).expect("seed");
    store.save_history_snapshot("w1", b"b", 2_000, None).expect("seed");

    let (tx, mut rx) = notification_channel();
    let notifier = Notifier::new(Arc::clone(&store), tx);

    let queued = notifier
        .send_content_changed_notification("w1")
        .expect("resolution succeeds");
    assert!(!queued);
    assert!(rx.try_recv().is_err());
    assert_eq!(
        store.get_watch("w1").expect("watch").notification_alert_count,
        0,
        "counter untouched when nothing was queued"
    );
}

#[test]
fn single_snapshot_history_is_insufficient() {
    let (store, _tmp) = store_with(SettingsBuilder::new().build());
    store.add_watch(
        WatchBuilder::new("w1", "https://example.test")
            .notification_urls(&["post://alerts.example"])
            .build(),
    );
    store.save_history_snapshot("w1", b"only", 1_000, None).expect("seed");

    let (tx, _rx) = notification_channel();
    let notifier = Notifier::new(Arc::clone(&store), tx);

    let err = notifier
        .send_content_changed_notification("w1")
        .expect_err("one snapshot cannot be diffed");
    assert!(matches!(err, NotificationError::InsufficientHistory));
}

#[test]
fn preview_payload_uses_example_pair_with_one_snapshot() {
    let watch = WatchBuilder::new("w1", "https://example.test").build();
    let err = build_change_notification(
        &watch,
        vec!["post://x".into()],
        "t".into(),
        "b".into(),
        NotificationFormat::Text,
        None,
    )
    .expect_err("empty history cannot build a payload");
    assert!(matches!(err, NotificationError::InsufficientHistory));

    let (store, _tmp) = store_with(SettingsBuilder::new().build());
    store.add_watch(watch);
    store
        .save_history_snapshot("w1", b"only snapshot", 1_000, None)
        .expect("seed");
    let watch = store.get_watch("w1").expect("watch");

    let n = build_change_notification(
        &watch,
        vec!["post://x".into()],
        "t".into(),
        "b".into(),
        NotificationFormat::Text,
        None,
    )
    .expect("one snapshot is enough for a preview");
    let diff = n.diff.expect("diff present");
    assert!(
        diff.diff.contains("Example text:"),
        "illustrative pair used: {}",
        diff.diff
    );
    assert_eq!(n.current_snapshot.as_deref(), Some("only snapshot"));
}

#[test]
fn html_format_joins_with_line_breaks() {
    let (store, _tmp) = store_with(SettingsBuilder::new().build());
    store.add_watch(
        WatchBuilder::new("w1", "https://example.test")
            .notification_urls(&["post://alerts.example"])
            .notification_format(NotificationFormat::Html)
            .build(),
    );
    store
        .save_history_snapshot("w1", b"line one\nline two", 1_000, None)
        .expect("seed");
    store
        .save_history_snapshot("w1", b"line one\nline three", 2_000, None)
        .expect("seed");

    let (tx, mut rx) = notification_channel();
    let notifier = Notifier::new(Arc::clone(&store), tx);
    notifier
        .send_content_changed_notification("w1")
        .expect("queued");

    let n = rx.try_recv().expect("queued");
    assert_eq!(n.format, NotificationFormat::Html);
    assert_eq!(
        n.current_snapshot.as_deref(),
        Some("line one<br>line three"),
        "snapshot line feeds converted for HTML"
    );
    let diff = n.diff.expect("diff");
    assert!(diff.diff_full.contains("<br>"), "diff joined with <br>: {}", diff.diff_full);
}

#[test]
fn trigger_text_extracts_matching_lines_only() {
    let (store, _tmp) = store_with(SettingsBuilder::new().build());
    store.add_watch(
        WatchBuilder::new("w1", "https://example.test")
            .notification_urls(&["post://alerts.example"])
            .trigger_text(&["/price: \\d+/", "SOLD OUT"])
            .build(),
    );
    store.save_history_snapshot("w1", b"irrelevant", 1_000, None).expect("seed");
    store
        .save_history_snapshot(
            "w1",
            b"header\nPrice: 42 euro\nfooter\nitem is sold out today",
            2_000,
            None,
        )
        .expect("seed");

    let (tx, mut rx) = notification_channel();
    let notifier = Notifier::new(Arc::clone(&store), tx);
    notifier
        .send_content_changed_notification("w1")
        .expect("queued");

    let n = rx.try_recv().expect("queued");
    assert_eq!(
        n.triggered_text.as_deref(),
        Some("Price: 42 euro\nitem is sold out today"),
        "regex trigger and case-insensitive substring trigger both match"
    );
}

#[test]
fn filter_failure_escalation_ignores_tags_for_urls() {
    let (store, _tmp) = store_with(SettingsBuilder::new().build());
    store.add_tag(
        TagBuilder::new("t")
            .notification_urls(&["post://tag-level"])
            .build(),
    );
    store.add_watch(
        WatchBuilder::new("w1", "https://example.test")
            .tags(&["t"])
            .include_filters(&["div#content"])
            .build(),
    );

    let (tx, mut rx) = notification_channel();
    let notifier = Notifier::new(Arc::clone(&store), tx);

    // Tag urls exist but escalations only consult watch-level else global.
    notifier.send_filter_failure_notification("w1");
    assert!(rx.try_recv().is_err(), "tag urls must not be used");

    store.set_settings(SettingsBuilder::new().notification_urls(&["post://global"]).build());
    notifier.send_filter_failure_notification("w1");
    let n = rx.try_recv().expect("global urls used");
    assert_eq!(n.urls, vec!["post://global".to_string()]);
    assert_eq!(n.format, NotificationFormat::Text);
    assert!(n.diff.is_none());
    assert!(n.screenshot.is_none());
    assert!(n.body.contains("div#content"));
}

#[test]
fn step_failure_escalation_prefers_watch_urls() {
    let (store, _tmp) = store_with(
        SettingsBuilder::new()
            .notification_urls(&["post://global"])
            .filter_failure_threshold(4)
            .build(),
    );
    store.add_watch(
        WatchBuilder::new("w1", "https://example.test")
            .notification_urls(&["post://watch-level"])
            .build(),
    );

    let (tx, mut rx) = notification_channel();
    let notifier = Notifier::new(Arc::clone(&store), tx);
    notifier.send_step_failure_notification("w1", 1);

    let n = rx.try_recv().expect("queued");
    assert_eq!(n.urls, vec!["post://watch-level".to_string()]);
    assert!(n.title.contains("position 2"), "1-based position: {}", n.title);
    assert!(n.body.contains("after 4 attempts"));
}
