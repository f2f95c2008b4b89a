// src/errors.rs

//! Crate-wide error aliases and the closed check-failure taxonomy.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PagewatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Watch not found: {0}")]
    WatchNotFound(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PagewatchError>;

/// Why a browser automation step could not run.
///
/// "Element not found" is special-cased because the driver's timeout text is
/// long and the first line already says everything useful; any other cause
/// keeps its first line of detail.
#[derive(Debug)]
pub enum StepFailureCause {
    ElementNotFound,
    Other(String),
}

/// Every way a single check attempt can fail.
///
/// This is a closed set: the worker routes each variant through the
/// classifier, which maps it to a deterministic recipe of persisted-field
/// updates, artifacts to save, and an optional escalation. Anything a
/// processor cannot name lands in [`CheckFailure::Other`].
#[derive(Error, Debug)]
pub enum CheckFailure {
    /// Local watch state could not be read or written due to permissions.
    #[error("permission denied accessing watch state: {0}")]
    PermissionDenied(String),

    /// The fetch returned markup, but nothing renderable as text.
    #[error("content received but no text could be extracted (status {status_code})")]
    NoExtractableText {
        status_code: u16,
        /// Whether the watch had include-filters configured at fetch time.
        has_filters: bool,
        /// The raw markup, used to tell "filters matched only an image"
        /// apart from "filters matched but held no text".
        html_content: String,
        screenshot: Option<Vec<u8>>,
    },

    /// The fetch completed with a non-2xx status.
    #[error("request returned HTTP status {status_code}")]
    NonSuccessStatus {
        status_code: u16,
        screenshot: Option<Vec<u8>>,
        xpath_data: Option<String>,
        page_text: Option<String>,
    },

    /// A configured CSS/xPath filter matched nothing in the response.
    #[error("configured filter was not present in the response")]
    FilterNotFound,

    /// The content checksum matched the previous check; explicit fast-skip.
    /// Not a real failure: it suppresses further processing this cycle.
    #[error("content checksum unchanged since previous check")]
    ChecksumUnchanged,

    /// Could not connect to the browser backend.
    #[error("browser connection failed: {message}")]
    BrowserConnectFailed { message: String },

    /// The browser fetch ran out of time.
    #[error("browser fetch timed out: {message}")]
    BrowserFetchTimedOut { message: String },

    /// A specific browser automation step failed. `step_index` is 0-based;
    /// persisted messages use the 1-based position.
    #[error("browser step {step_index} failed")]
    BrowserStepFailed {
        step_index: u32,
        cause: StepFailureCause,
    },

    /// The server replied with an empty body.
    #[error("empty reply from fetch (status {status_code})")]
    EmptyReply { status_code: u16 },

    /// A screenshot was requested but the page never rendered far enough.
    #[error("screenshot unavailable (status {status_code})")]
    ScreenshotUnavailable { status_code: u16 },

    /// Configured scripted browser actions failed to execute.
    #[error("scripted action execution failed: {message}")]
    ScriptedActionFailed {
        status_code: u16,
        message: String,
        screenshot: Option<Vec<u8>>,
    },

    /// The page could not be loaded at all.
    #[error("page could not be loaded")]
    PageUnloadable {
        status_code: u16,
        message: Option<String>,
        screenshot: Option<Vec<u8>>,
    },

    /// The watch has browser steps configured, but the selected fetch mode
    /// cannot run them.
    #[error("browser steps are configured but unsupported by the fetch mode")]
    BrowserStepsUnsupported,

    /// Structured restock data could not be extracted from the page.
    #[error("unable to extract restock data (status {status_code})")]
    RestockExtractionFailed { status_code: u16 },

    /// Catch-all for anything the processor could not classify.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}
