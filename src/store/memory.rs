// src/store/memory.rs

//! In-memory datastore with on-disk artifact files.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::debug;

use crate::config::AppSettings;
use crate::errors::Result;
use crate::model::{Tag, Watch, WatchUpdate};
use crate::store::artifacts::ArtifactStore;
use crate::store::Datastore;
use crate::types::WatchId;

#[derive(Debug, Default)]
struct StoreState {
    watching: HashMap<WatchId, Watch>,
    tags: HashMap<String, Tag>,
}

/// Reference [`Datastore`] implementation.
///
/// Watches and tags live in memory behind one lock; every mutation goes
/// through that lock, which is what makes `update_watch` an atomic merge.
/// Artifact files live on disk under the given root so the error-artifact
/// cleanup contract stays externally observable.
#[derive(Debug)]
pub struct MemoryDatastore {
    state: Mutex<StoreState>,
    settings: Mutex<AppSettings>,
    artifacts: ArtifactStore,
}

impl MemoryDatastore {
    pub fn new(settings: AppSettings, artifact_root: impl Into<PathBuf>) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            settings: Mutex::new(settings),
            artifacts: ArtifactStore::new(artifact_root),
        }
    }

    pub fn add_watch(&self, watch: Watch) {
        let mut state = self.state.lock().expect("datastore lock poisoned");
        state.watching.insert(watch.id.clone(), watch);
    }

    pub fn add_tag(&self, tag: Tag) {
        let mut state = self.state.lock().expect("datastore lock poisoned");
        state.tags.insert(tag.id.clone(), tag);
    }

    pub fn remove_watch(&self, watch_id: &str) {
        let mut state = self.state.lock().expect("datastore lock poisoned");
        state.watching.remove(watch_id);
    }

    pub fn set_settings(&self, settings: AppSettings) {
        *self.settings.lock().expect("settings lock poisoned") = settings;
    }

    /// Direct access to the artifact store, mainly for tests asserting on
    /// the error-file side channel.
    pub fn artifact_store(&self) -> &ArtifactStore {
        &self.artifacts
    }
}

impl Datastore for MemoryDatastore {
    fn get_watch(&self, watch_id: &str) -> Option<Watch> {
        let state = self.state.lock().expect("datastore lock poisoned");
        state.watching.get(watch_id).cloned()
    }

    fn update_watch(&self, watch_id: &str, update: WatchUpdate) -> Result<()> {
        let mut state = self.state.lock().expect("datastore lock poisoned");
        match state.watching.get_mut(watch_id) {
            Some(watch) => watch.apply(update),
            None => debug!(watch = %watch_id, "update for unknown watch dropped"),
        }
        Ok(())
    }

    fn tags_for_watch(&self, watch_id: &str) -> Vec<Tag> {
        let state = self.state.lock().expect("datastore lock poisoned");
        let Some(watch) = state.watching.get(watch_id) else {
            return Vec::new();
        };
        watch
            .tags
            .iter()
            .filter_map(|tag_id| state.tags.get(tag_id).cloned())
            .collect()
    }

    fn save_history_snapshot(
        &self,
        watch_id: &str,
        contents: &[u8],
        timestamp: u64,
        prior_fingerprint: Option<&str>,
    ) -> Result<u64> {
        let mut state = self.state.lock().expect("datastore lock poisoned");
        let watch = state.watching.get_mut(watch_id).ok_or_else(|| {
            crate::errors::PagewatchError::WatchNotFound(watch_id.to_string())
        })?;
        let key = watch.append_snapshot(contents, timestamp, prior_fingerprint);
        debug!(watch = %watch_id, key, "history snapshot saved");
        Ok(key)
    }

    fn save_screenshot(&self, watch_id: &str, bytes: &[u8], as_error: bool) -> Result<()> {
        self.artifacts.save_screenshot(watch_id, bytes, as_error)
    }

    fn save_xpath_data(&self, watch_id: &str, data: &str, as_error: bool) -> Result<()> {
        self.artifacts.save_xpath_data(watch_id, data, as_error)
    }

    fn save_error_text(&self, watch_id: &str, contents: &str) -> Result<()> {
        self.artifacts.save_error_text(watch_id, contents)
    }

    fn get_screenshot(&self, watch_id: &str) -> Option<Vec<u8>> {
        self.artifacts.load_screenshot(watch_id)
    }

    fn cleanup_error_artifacts(&self, watch_id: &str) -> Result<()> {
        self.artifacts.cleanup_error_artifacts(watch_id)
    }

    fn settings(&self) -> AppSettings {
        self.settings.lock().expect("settings lock poisoned").clone()
    }
}
