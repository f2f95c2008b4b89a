use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use pagewatch::errors::CheckFailure;
use pagewatch::model::Watch;
use pagewatch::processor::{
    ChangeProcessor, CheckReport, CheckSuccess, FetchArtifacts, ProcessorFactory,
};
use pagewatch::types::{ProcessorKind, WatchId};

/// A fake processor factory that:
/// - records which watches were checked (and with which processor kind)
/// - replays a script of pre-built `CheckReport`s, one per check, in order.
///
/// When the script runs dry, checks return an unchanged success with empty
/// content.
pub struct FakeProcessorFactory {
    script: Arc<Mutex<VecDeque<CheckReport>>>,
    checks: Arc<Mutex<Vec<(WatchId, ProcessorKind)>>>,
}

impl FakeProcessorFactory {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            checks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue the report returned by the next check.
    pub fn push_report(&self, report: CheckReport) {
        self.script.lock().unwrap().push_back(report);
    }

    /// Watches checked so far, in order.
    pub fn checks(&self) -> Vec<(WatchId, ProcessorKind)> {
        self.checks.lock().unwrap().clone()
    }
}

impl Default for FakeProcessorFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessorFactory for FakeProcessorFactory {
    fn make(&self, kind: ProcessorKind) -> Box<dyn ChangeProcessor> {
        Box::new(FakeProcessor {
            kind,
            script: Arc::clone(&self.script),
            checks: Arc::clone(&self.checks),
        })
    }
}

struct FakeProcessor {
    kind: ProcessorKind,
    script: Arc<Mutex<VecDeque<CheckReport>>>,
    checks: Arc<Mutex<Vec<(WatchId, ProcessorKind)>>>,
}

impl ChangeProcessor for FakeProcessor {
    fn perform_check<'a>(
        &'a mut self,
        watch: &'a Watch,
        _skip_when_checksum_same: bool,
    ) -> Pin<Box<dyn Future<Output = CheckReport> + Send + 'a>> {
        Box::pin(async move {
            self.checks
                .lock()
                .unwrap()
                .push((watch.id.clone(), self.kind));

            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| success_report(false, b""))
        })
    }
}

/// A successful check report with the given change flag and raw contents.
pub fn success_report(changed: bool, contents: &[u8]) -> CheckReport {
    CheckReport {
        outcome: Ok(CheckSuccess {
            changed,
            update: Default::default(),
            contents: contents.to_vec(),
        }),
        fetch: FetchArtifacts::default(),
    }
}

/// A failed check report.
pub fn failure_report(failure: CheckFailure) -> CheckReport {
    CheckReport {
        outcome: Err(failure),
        fetch: FetchArtifacts::default(),
    }
}
