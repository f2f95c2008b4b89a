// tests/worker_check_loop.rs

//! End-to-end worker loop tests with a scripted fake processor.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use pagewatch::errors::CheckFailure;
use pagewatch::notification::{notification_channel, NotificationReceiver, NotificationSender};
use pagewatch::processor::ProcessorFactory;
use pagewatch::store::artifacts::{ERROR_SCREENSHOT_FILENAME, ERROR_TEXT_FILENAME};
use pagewatch::store::{Datastore, MemoryDatastore};
use pagewatch::worker::{shutdown_channel, CheckJob, CheckQueue, CheckWorker, ShutdownHandle, ShutdownSignal};
use pagewatch::AppSettings;

use pagewatch_test_utils::builders::{SettingsBuilder, WatchBuilder};
use pagewatch_test_utils::fake_processor::{failure_report, success_report, FakeProcessorFactory};
use pagewatch_test_utils::{init_tracing, with_timeout};

struct TestRig {
    _tmp: tempfile::TempDir,
    store: Arc<MemoryDatastore>,
    queue: Arc<CheckQueue>,
    factory: Arc<FakeProcessorFactory>,
    _notifications_tx: NotificationSender,
    notifications: NotificationReceiver,
    shutdown: ShutdownHandle,
    signal: ShutdownSignal,
}

impl TestRig {
    fn new(settings: AppSettings) -> Self {
        init_tracing();
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(MemoryDatastore::new(settings, tmp.path()));
        let queue = Arc::new(CheckQueue::new());
        let factory = Arc::new(FakeProcessorFactory::new());
        let (tx, rx) = notification_channel();
        let (shutdown, signal) = shutdown_channel();
        Self {
            _tmp: tmp,
            store,
            queue,
            factory,
            _notifications_tx: tx,
            notifications: rx,
            shutdown,
            signal,
        }
    }

    fn spawn_worker(&self) -> JoinHandle<()> {
        let worker = CheckWorker::new(
            0,
            Arc::clone(&self.queue),
            Arc::clone(&self.store),
            Arc::clone(&self.factory) as Arc<dyn ProcessorFactory>,
            self._notifications_tx.clone(),
            self.signal.clone(),
        );
        tokio::spawn(worker.run())
    }

    /// Wait until every queued job was popped and acknowledged.
    async fn drain(&self) {
        with_timeout(async {
            loop {
                if self.queue.is_idle() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
    }
}

fn default_rig() -> TestRig {
    TestRig::new(SettingsBuilder::new().build())
}

#[tokio::test]
async fn first_successful_check_establishes_baseline_without_notification() {
    let rig = default_rig();
    rig.store.add_watch(
        WatchBuilder::new("w1", "https://example.test/page")
            .notification_urls(&["post://alerts.example"])
            .build(),
    );
    rig.factory.push_report(success_report(false, b"hello world"));
    rig.queue.push(CheckJob::new("w1"));

    let handle = rig.spawn_worker();
    rig.drain().await;

    let mut rig = rig;
    let watch = rig.store.get_watch("w1").expect("watch exists");
    assert_eq!(watch.history.len(), 1, "baseline snapshot saved");
    assert_eq!(watch.last_error, None);
    assert_eq!(watch.check_count, 1);
    assert!(watch.last_checked > 0);
    assert!(rig.notifications.try_recv().is_err(), "no notification on baseline");

    rig.shutdown.shutdown();
    with_timeout(handle).await.expect("worker exits cleanly");
}

#[tokio::test]
async fn change_on_second_check_queues_exactly_one_notification() {
    let rig = default_rig();
    rig.store.add_watch(
        WatchBuilder::new("w1", "https://example.test/page")
            .notification_urls(&["post://alerts.example"])
            .build(),
    );
    rig.store
        .save_history_snapshot("w1", b"A", 1_000, None)
        .expect("seed history");

    rig.factory.push_report(success_report(true, b"B"));
    rig.queue.push(CheckJob::new("w1"));

    let _worker = rig.spawn_worker();
    rig.drain().await;

    let mut rig = rig;
    let watch = rig.store.get_watch("w1").expect("watch exists");
    assert_eq!(watch.history.len(), 2, "history grew to two entries");
    assert_eq!(watch.last_error, None);
    assert_eq!(watch.notification_alert_count, 1);

    let notification = rig.notifications.try_recv().expect("one notification queued");
    assert_eq!(notification.watch_id.as_deref(), Some("w1"));
    assert_eq!(
        notification.watch_url.as_deref(),
        Some("https://example.test/page")
    );
    let diff = notification.diff.expect("change notifications carry diffs");
    assert!(diff.diff.contains("B"), "diff mentions the new content: {}", diff.diff);
    assert!(rig.notifications.try_recv().is_err(), "exactly one notification");
}

#[tokio::test]
async fn change_on_first_ever_check_saves_history_but_never_notifies() {
    let rig = default_rig();
    rig.store.add_watch(
        WatchBuilder::new("w1", "https://example.test")
            .notification_urls(&["post://alerts.example"])
            .build(),
    );
    rig.factory.push_report(success_report(true, b"fresh content"));
    rig.queue.push(CheckJob::new("w1"));

    let _worker = rig.spawn_worker();
    rig.drain().await;

    let mut rig = rig;
    let watch = rig.store.get_watch("w1").expect("watch exists");
    assert_eq!(watch.history.len(), 1);
    assert!(
        rig.notifications.try_recv().is_err(),
        "first history save must never notify"
    );
}

#[tokio::test]
async fn muted_watch_change_is_not_notified() {
    let rig = default_rig();
    rig.store.add_watch(
        WatchBuilder::new("w1", "https://example.test")
            .notification_urls(&["post://alerts.example"])
            .muted()
            .build(),
    );
    rig.store
        .save_history_snapshot("w1", b"A", 1_000, None)
        .expect("seed history");
    rig.factory.push_report(success_report(true, b"B"));
    rig.queue.push(CheckJob::new("w1"));

    let _worker = rig.spawn_worker();
    rig.drain().await;

    let mut rig = rig;
    let watch = rig.store.get_watch("w1").expect("watch exists");
    assert_eq!(watch.history.len(), 2, "history still advances when muted");
    assert_eq!(watch.notification_alert_count, 0);
    assert!(rig.notifications.try_recv().is_err());
}

#[tokio::test]
async fn job_for_removed_watch_is_discarded_and_acknowledged() {
    let rig = default_rig();
    rig.queue.push(CheckJob::new("never-existed"));

    let _worker = rig.spawn_worker();
    rig.drain().await;

    assert!(rig.queue.is_idle(), "job acknowledged despite missing watch");
    assert!(rig.factory.checks().is_empty(), "processor never invoked");
}

#[tokio::test]
async fn unchanged_checksum_clears_error_and_suppresses_processing() {
    let rig = default_rig();
    let mut watch = WatchBuilder::new("w1", "https://example.test").build();
    watch.last_error = Some("Error - 404 (Page not found) received".to_string());
    rig.store.add_watch(watch);
    rig.store
        .save_history_snapshot("w1", b"A", 1_000, None)
        .expect("seed history");

    rig.factory
        .push_report(failure_report(CheckFailure::ChecksumUnchanged));
    rig.queue
        .push(CheckJob::new("w1").skip_when_checksum_same(true));

    let _worker = rig.spawn_worker();
    rig.drain().await;

    let mut rig = rig;
    let watch = rig.store.get_watch("w1").expect("watch exists");
    assert_eq!(watch.last_error, None, "explicitly cleared to healthy");
    assert_eq!(watch.history.len(), 1, "no history append");
    assert_eq!(watch.check_count, 1, "attempt still recorded");
    assert!(rig.notifications.try_recv().is_err());
}

#[tokio::test]
async fn non_success_status_records_exact_message_and_error_artifacts() {
    let rig = default_rig();
    rig.store
        .add_watch(WatchBuilder::new("w1", "https://example.test").build());
    rig.store
        .save_history_snapshot("w1", b"A", 1_000, None)
        .expect("seed history");

    rig.factory.push_report(failure_report(CheckFailure::NonSuccessStatus {
        status_code: 404,
        screenshot: Some(vec![0x89, 0x50]),
        xpath_data: None,
        page_text: Some("not found page body".to_string()),
    }));
    rig.queue.push(CheckJob::new("w1"));

    let _worker = rig.spawn_worker();
    rig.drain().await;

    let watch = rig.store.get_watch("w1").expect("watch exists");
    assert_eq!(
        watch.last_error.as_deref(),
        Some("Error - 404 (Page not found) received")
    );
    assert_eq!(watch.history.len(), 1, "history unchanged on failure");

    let dir = rig.store.artifact_store().watch_dir("w1");
    assert!(dir.join(ERROR_SCREENSHOT_FILENAME).is_file());
    assert!(dir.join(ERROR_TEXT_FILENAME).is_file());
}

#[tokio::test]
async fn success_after_failure_cleans_error_artifacts_and_step_marker() {
    let rig = default_rig();
    let mut watch = WatchBuilder::new("w1", "https://example.test").build();
    watch.browser_steps_last_error_step = Some(2);
    rig.store.add_watch(watch);
    rig.store
        .save_error_text("w1", "old error body")
        .expect("seed error text");
    rig.store
        .save_screenshot("w1", &[1, 2, 3], true)
        .expect("seed error screenshot");

    rig.factory.push_report(success_report(false, b"all good"));
    rig.queue.push(CheckJob::new("w1"));

    let _worker = rig.spawn_worker();
    rig.drain().await;

    let watch = rig.store.get_watch("w1").expect("watch exists");
    assert_eq!(watch.last_error, None);
    assert_eq!(
        watch.browser_steps_last_error_step, None,
        "stale step marker cleared in preflight"
    );

    let dir = rig.store.artifact_store().watch_dir("w1");
    assert!(!dir.join(ERROR_TEXT_FILENAME).exists(), "error text removed");
    assert!(
        !dir.join(ERROR_SCREENSHOT_FILENAME).exists(),
        "error screenshot removed"
    );
}

#[tokio::test]
async fn success_resets_filter_failure_counter_unless_opted_out() {
    let rig = default_rig();
    rig.store.add_watch(
        WatchBuilder::new("w1", "https://example.test")
            .consecutive_filter_failures(4)
            .build(),
    );
    rig.store.add_watch(
        WatchBuilder::new("w2", "https://example.test/other")
            .consecutive_filter_failures(4)
            .ignore_status_codes(true)
            .build(),
    );

    rig.factory.push_report(success_report(false, b"a"));
    rig.factory.push_report(success_report(false, b"b"));
    rig.queue.push(CheckJob::new("w1").with_priority(1));
    rig.queue.push(CheckJob::new("w2").with_priority(2));

    let _worker = rig.spawn_worker();
    rig.drain().await;

    let w1 = rig.store.get_watch("w1").expect("watch exists");
    assert_eq!(w1.consecutive_filter_failures, 0, "counter reset on success");
    let w2 = rig.store.get_watch("w2").expect("watch exists");
    assert_eq!(
        w2.consecutive_filter_failures, 4,
        "ignore_status_codes keeps the counter"
    );
}

#[tokio::test]
async fn processor_selected_by_watch_kind() {
    use pagewatch::types::ProcessorKind;

    let rig = default_rig();
    rig.store.add_watch(
        WatchBuilder::new("w1", "https://example.test")
            .processor(ProcessorKind::RestockDiff)
            .build(),
    );
    rig.factory.push_report(success_report(false, b"in stock"));
    rig.queue.push(CheckJob::new("w1"));

    let _worker = rig.spawn_worker();
    rig.drain().await;

    assert_eq!(
        rig.factory.checks(),
        vec![("w1".to_string(), ProcessorKind::RestockDiff)]
    );
}

#[tokio::test]
async fn worker_exits_on_shutdown_signal_with_empty_queue() {
    let rig = default_rig();
    let handle = rig.spawn_worker();

    // Give the worker a moment to park on the empty queue.
    tokio::time::sleep(Duration::from_millis(50)).await;
    rig.shutdown.shutdown();

    with_timeout(handle).await.expect("worker task ends");
}
