// src/worker/mod.rs

//! The per-item check worker: queue, failure classifier, state updater,
//! and the worker loop itself.
//!
//! Control flow per dequeued job:
//!
//! worker loop → processor → (success | typed failure) → classifier →
//! state updater → (on confirmed change) notification cascade → outbound
//! queue.
//!
//! The pure decision logic lives in [`classifier`] (failure → recipe as
//! data); the IO-heavy application of those decisions lives in
//! [`updater`] and [`check_worker`].

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::notification::NotificationSender;
use crate::processor::ProcessorFactory;
use crate::store::Datastore;

pub mod check_worker;
pub mod classifier;
pub mod queue;
pub mod updater;

pub use check_worker::{shutdown_channel, CheckWorker, ShutdownHandle, ShutdownSignal};
pub use classifier::{classify, ArtifactSave, EscalationKind, FailureRecipe};
pub use queue::{CheckJob, CheckQueue};
pub use updater::{commit_check_result, record_attempt};

/// Spawn `count` check workers against one shared queue.
///
/// Workers exit once the shutdown signal fires and their in-flight job (if
/// any) finished its single attempt.
pub fn spawn_workers<D: Datastore + 'static>(
    count: usize,
    queue: Arc<CheckQueue>,
    store: Arc<D>,
    processors: Arc<dyn ProcessorFactory>,
    notifications: NotificationSender,
    shutdown: ShutdownSignal,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|id| {
            let worker = CheckWorker::new(
                id,
                Arc::clone(&queue),
                Arc::clone(&store),
                Arc::clone(&processors),
                notifications.clone(),
                shutdown.clone(),
            );
            tokio::spawn(worker.run())
        })
        .collect()
}
