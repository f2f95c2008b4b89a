// src/config/validate.rs

use crate::config::model::{AppSettings, RawSettings};
use crate::errors::{PagewatchError, Result};

impl TryFrom<RawSettings> for AppSettings {
    type Error = PagewatchError;

    fn try_from(raw: RawSettings) -> std::result::Result<Self, Self::Error> {
        validate_raw_settings(&raw)?;
        Ok(AppSettings::new_unchecked(raw))
    }
}

fn validate_raw_settings(raw: &RawSettings) -> Result<()> {
    if raw.workers == 0 {
        return Err(PagewatchError::ConfigError(
            "workers must be >= 1 (got 0)".to_string(),
        ));
    }

    for url in raw.notification_urls.iter() {
        if url.trim().is_empty() {
            return Err(PagewatchError::ConfigError(
                "notification_urls must not contain empty entries".to_string(),
            ));
        }
    }

    Ok(())
}
