// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{AppSettings, RawSettings};
use crate::errors::Result;

/// Load settings from a given path and return the raw `RawSettings`.
///
/// This only performs TOML deserialization; it does **not** perform
/// semantic validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawSettings> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let settings: RawSettings = toml::from_str(&contents)?;

    Ok(settings)
}

/// Load settings from path and run basic validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks worker count and notification url sanity.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<AppSettings> {
    let raw = load_from_path(&path)?;
    let settings = AppSettings::try_from(raw)?;
    Ok(settings)
}

/// Helper to resolve a default config path.
///
/// Currently this just returns `Pagewatch.toml` in the current working
/// directory; it exists so an embedder can later respect an env var or
/// probe multiple locations.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Pagewatch.toml")
}
