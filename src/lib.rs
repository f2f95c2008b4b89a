// src/lib.rs

pub mod config;
pub mod diff;
pub mod errors;
pub mod fingerprint;
pub mod logging;
pub mod model;
pub mod notification;
pub mod processor;
pub mod store;
pub mod types;
pub mod worker;

pub use config::AppSettings;
pub use errors::{CheckFailure, PagewatchError, StepFailureCause};
pub use model::{History, LastError, Snapshot, Tag, Watch, WatchUpdate};
pub use notification::{notification_channel, Notification, NotificationSender, Notifier};
pub use processor::{ChangeProcessor, CheckReport, CheckSuccess, FetchArtifacts, ProcessorFactory};
pub use store::{Datastore, MemoryDatastore};
pub use types::{NotificationFormat, ProcessorKind, WatchId};
pub use worker::{
    shutdown_channel, spawn_workers, CheckJob, CheckQueue, CheckWorker, ShutdownHandle,
    ShutdownSignal,
};
