// src/worker/classifier.rs

//! Maps every check failure to a deterministic recipe of persisted-field
//! updates, artifacts to save, and an optional escalation.
//!
//! This is the table form of the failure taxonomy: one handler per
//! [`CheckFailure`] kind, each returning plain data that the worker then
//! applies. Keeping the recipes as data (rather than side effects inside a
//! dispatch) is what makes the table directly testable.

use crate::errors::{CheckFailure, StepFailureCause};
use crate::model::{LastError, WatchUpdate};

/// An artifact the worker should persist as part of a failure recipe.
#[derive(Debug)]
pub enum ArtifactSave {
    Screenshot { bytes: Vec<u8>, as_error: bool },
    XpathData { data: String, as_error: bool },
    ErrorText { contents: String },
}

/// Which escalation path a failure feeds, sharing the consecutive-failure
/// threshold logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationKind {
    FilterFailure,
    /// 0-based index of the failing browser step.
    StepFailure { step_index: u32 },
}

/// Deterministic side-effect recipe for one failure kind.
#[derive(Debug, Default)]
pub struct FailureRecipe {
    pub update: WatchUpdate,
    pub artifacts: Vec<ArtifactSave>,
    pub escalation: Option<EscalationKind>,
}

impl FailureRecipe {
    fn with_error(message: impl Into<String>) -> Self {
        Self {
            update: WatchUpdate {
                last_error: Some(LastError::Message(message.into())),
                ..WatchUpdate::default()
            },
            ..Self::default()
        }
    }
}

/// Classify a failed check attempt into its side-effect recipe.
///
/// For every kind the success path is suppressed: history is not advanced
/// and no change notification fires for the attempt; the per-attempt
/// bookkeeping still runs separately.
pub fn classify(failure: CheckFailure) -> FailureRecipe {
    match failure {
        // Critical log only; no persisted state change.
        CheckFailure::PermissionDenied(_) => FailureRecipe::default(),

        CheckFailure::NoExtractableText {
            status_code,
            has_filters,
            html_content,
            screenshot,
        } => {
            let extra_help = if has_filters {
                if content_has_image(&html_content) {
                    ", it's possible that the filters you have give an empty result \
                     or contain only an image."
                } else {
                    ", it's possible that the filters were found, but contained no usable text."
                }
            } else {
                ""
            };
            let mut recipe = FailureRecipe::with_error(format!(
                "Got HTML content but no text found (With {status_code} reply code){extra_help}"
            ));
            if let Some(bytes) = screenshot {
                recipe.artifacts.push(ArtifactSave::Screenshot {
                    bytes,
                    as_error: false,
                });
            }
            recipe
        }

        CheckFailure::NonSuccessStatus {
            status_code,
            screenshot,
            xpath_data,
            page_text,
        } => {
            let err_text = match status_code {
                403 => "Error - 403 (Access denied) received".to_string(),
                404 => "Error - 404 (Page not found) received".to_string(),
                407 => "Error - 407 (Proxy authentication required) received, did you need \
                        a username and password for the proxy?"
                    .to_string(),
                500 => "Error - 500 (Internal server error) received from the web site"
                    .to_string(),
                other => format!("Error - Request returned a HTTP error code {other}"),
            };
            let mut recipe = FailureRecipe::with_error(err_text);
            if let Some(bytes) = screenshot {
                recipe.artifacts.push(ArtifactSave::Screenshot {
                    bytes,
                    as_error: true,
                });
            }
            if let Some(data) = xpath_data {
                recipe.artifacts.push(ArtifactSave::XpathData {
                    data,
                    as_error: true,
                });
            }
            if let Some(contents) = page_text {
                recipe.artifacts.push(ArtifactSave::ErrorText { contents });
            }
            recipe
        }

        CheckFailure::FilterNotFound => {
            let mut recipe = FailureRecipe::with_error(
                "Warning, no filters were found, no change detection ran - Did the page \
                 change layout? update your Visual Filter if necessary.",
            );
            recipe.escalation = Some(EscalationKind::FilterFailure);
            recipe
        }

        // Not a failure: content was byte-identical, clear any stale error.
        CheckFailure::ChecksumUnchanged => FailureRecipe {
            update: WatchUpdate {
                last_error: Some(LastError::Healthy),
                ..WatchUpdate::default()
            },
            ..FailureRecipe::default()
        },

        CheckFailure::BrowserConnectFailed { message }
        | CheckFailure::BrowserFetchTimedOut { message } => FailureRecipe::with_error(message),

        CheckFailure::BrowserStepFailed { step_index, cause } => {
            let position = step_index + 1;
            let mut err_text = format!(
                "Browser step at position {position} could not run, check the watch, add a \
                 delay if necessary, view Browser Steps to see screenshot at that step."
            );
            match cause {
                StepFailureCause::ElementNotFound => {
                    err_text.push_str(" Could not find the target.");
                }
                StepFailureCause::Other(detail) => {
                    // Just the first line; the rest is driver stack trace.
                    let first_line = detail.lines().next().unwrap_or_default();
                    err_text.push(' ');
                    err_text.push_str(first_line);
                }
            }
            let mut recipe = FailureRecipe::with_error(err_text);
            recipe.update.browser_steps_last_error_step = Some(Some(position));
            recipe.escalation = Some(EscalationKind::StepFailure { step_index });
            recipe
        }

        CheckFailure::EmptyReply { status_code } => {
            let mut recipe = FailureRecipe::with_error(format!(
                "EmptyReply - try increasing 'Wait seconds before extracting text', \
                 Status Code {status_code}"
            ));
            recipe.update.last_check_status = Some(status_code);
            recipe
        }

        CheckFailure::ScreenshotUnavailable { status_code } => {
            let mut recipe = FailureRecipe::with_error(
                "Screenshot unavailable, page did not render fully in the expected time or \
                 page was too long - try increasing 'Wait seconds before extracting text'",
            );
            recipe.update.last_check_status = Some(status_code);
            recipe
        }

        CheckFailure::ScriptedActionFailed {
            status_code,
            message,
            screenshot,
        } => {
            let mut recipe =
                FailureRecipe::with_error(format!("Error running JS Actions - Page request - {message}"));
            recipe.update.last_check_status = Some(status_code);
            if let Some(bytes) = screenshot {
                recipe.artifacts.push(ArtifactSave::Screenshot {
                    bytes,
                    as_error: true,
                });
            }
            recipe
        }

        CheckFailure::PageUnloadable {
            status_code,
            message,
            screenshot,
        } => {
            let mut err_text = "Page request from server didnt respond correctly".to_string();
            if let Some(detail) = message {
                err_text = format!("{err_text} - {detail}");
            }
            let mut recipe = FailureRecipe::with_error(err_text);
            recipe.update.last_check_status = Some(status_code);
            recipe.update.has_price_data = Some(None);
            if let Some(bytes) = screenshot {
                recipe.artifacts.push(ArtifactSave::Screenshot {
                    bytes,
                    as_error: true,
                });
            }
            recipe
        }

        CheckFailure::BrowserStepsUnsupported => FailureRecipe::with_error(
            "This watch has Browser Steps configured and so it cannot run with the 'Basic \
             fast Plaintext/HTTP Client', either remove the Browser Steps or select a Chrome \
             fetcher.",
        ),

        CheckFailure::RestockExtractionFailed { status_code } => FailureRecipe::with_error(
            format!(
                "Unable to extract restock data for this page unfortunately. \
                 (Got code {status_code} from server)"
            ),
        ),

        CheckFailure::Other(e) => FailureRecipe::with_error(format!("Exception: {e}")),
    }
}

/// Crude but sufficient image probe over raw markup, used to pick the more
/// helpful "no text found" message.
fn content_has_image(html_content: &str) -> bool {
    html_content.to_ascii_lowercase().contains("<img")
}
