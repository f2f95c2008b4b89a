// src/store/artifacts.rs

//! Per-watch artifact files on disk.
//!
//! Each watch owns a directory `<root>/<watch id>/` holding the latest
//! fetch artifacts. Error-state artifacts get their own file names so a
//! later successful check can clean them up without touching the healthy
//! ones; the presence of the two error files is the externally observable
//! trace of that cleanup.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::errors::Result;

pub const SCREENSHOT_FILENAME: &str = "last-screenshot.png";
pub const ERROR_SCREENSHOT_FILENAME: &str = "last-error-screenshot.png";
pub const XPATH_FILENAME: &str = "last-elements.json";
pub const ERROR_XPATH_FILENAME: &str = "last-error-elements.json";
pub const ERROR_TEXT_FILENAME: &str = "last-error.txt";

/// Stores per-watch artifact files under a root directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding one watch's artifacts.
    pub fn watch_dir(&self, watch_id: &str) -> PathBuf {
        self.root.join(watch_id)
    }

    fn write(&self, watch_id: &str, filename: &str, contents: &[u8]) -> Result<()> {
        let dir = self.watch_dir(watch_id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating artifact dir {:?}", dir))?;
        let path = dir.join(filename);
        fs::write(&path, contents)
            .with_context(|| format!("writing artifact {:?}", path))?;
        Ok(())
    }

    pub fn save_screenshot(&self, watch_id: &str, bytes: &[u8], as_error: bool) -> Result<()> {
        let filename = if as_error {
            ERROR_SCREENSHOT_FILENAME
        } else {
            SCREENSHOT_FILENAME
        };
        self.write(watch_id, filename, bytes)
    }

    pub fn save_xpath_data(&self, watch_id: &str, data: &str, as_error: bool) -> Result<()> {
        let filename = if as_error {
            ERROR_XPATH_FILENAME
        } else {
            XPATH_FILENAME
        };
        self.write(watch_id, filename, data.as_bytes())
    }

    pub fn save_error_text(&self, watch_id: &str, contents: &str) -> Result<()> {
        self.write(watch_id, ERROR_TEXT_FILENAME, contents.as_bytes())
    }

    /// Load the latest (healthy) screenshot, if one was ever saved.
    pub fn load_screenshot(&self, watch_id: &str) -> Option<Vec<u8>> {
        fs::read(self.watch_dir(watch_id).join(SCREENSHOT_FILENAME)).ok()
    }

    /// Remove the error-state artifacts for a watch.
    ///
    /// Idempotent: missing files are not an error, so this can run after
    /// every successful check without first probing the directory.
    pub fn cleanup_error_artifacts(&self, watch_id: &str) -> Result<()> {
        for filename in [ERROR_SCREENSHOT_FILENAME, ERROR_TEXT_FILENAME] {
            let path = self.watch_dir(watch_id).join(filename);
            remove_if_present(&path)?;
        }
        Ok(())
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(anyhow::Error::from(e)
            .context(format!("removing artifact {:?}", path))
            .into()),
    }
}
