use serde::Serialize;
use staffhub_core::{AppResult, Feedback};
use tracing::warn;

/// What the presentation layer shows after a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    /// Whether the mutation committed.
    pub success: bool,
    /// How to surface the result.
    pub feedback: Feedback,
    /// User-facing message.
    pub message: String,
}

impl MutationOutcome {
    /// Successful outcome shown as a snackbar.
    #[must_use]
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            feedback: Feedback::Snackbar,
            message: message.into(),
        }
    }

    /// Maps a mutation result into an outcome. Failures are logged.
    #[must_use]
    pub fn from_result<T>(result: &AppResult<T>, success_message: &str) -> Self {
        match result {
            Ok(_) => Self::succeeded(success_message),
            Err(error) => {
                warn!(error = %error, "mutation failed");
                Self {
                    success: false,
                    feedback: error.feedback(),
                    message: error.to_string(),
                }
            }
        }
    }
}
