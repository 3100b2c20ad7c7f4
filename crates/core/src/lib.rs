//! Shared primitives for all Rust crates in Staffhub.

#![forbid(unsafe_code)]

/// Acting-user primitives shared across services.
pub mod actor;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use actor::{Actor, UserId};

/// Result type used across Staffhub crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string. Surrounding whitespace is trimmed.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for NonEmptyString {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// How the presentation layer should surface an operation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    /// Shown next to the offending form field.
    Inline,
    /// Short, non-blocking confirmation.
    Snackbar,
    /// Blocking dialog the user must acknowledge.
    Dialog,
    /// Logged only, never shown.
    Silent,
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant, detected before any store call.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller is not authenticated.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Store read or write failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Notification delivery failed.
    #[error("notification error: {0}")]
    Notification(String),

    /// A channel failed to attach or was interrupted.
    #[error("subscription error: {0}")]
    Subscription(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the feedback category the presentation layer should use.
    #[must_use]
    pub fn feedback(&self) -> Feedback {
        match self {
            Self::Validation(_) => Feedback::Inline,
            Self::Notification(_) | Self::Subscription(_) => Feedback::Silent,
            Self::NotFound(_)
            | Self::Conflict(_)
            | Self::Unauthorized(_)
            | Self::Persistence(_)
            | Self::Internal(_) => Feedback::Dialog,
        }
    }

    /// Returns whether the error stays out of the user's sight.
    #[must_use]
    pub fn is_silent(&self) -> bool {
        self.feedback() == Feedback::Silent
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, Feedback, NonEmptyString};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn non_empty_string_trims_input() {
        let value = NonEmptyString::new("  Staff Calendar ").unwrap_or_else(|_| unreachable!());
        assert_eq!(value.as_str(), "Staff Calendar");
    }

    #[test]
    fn feedback_follows_error_category() {
        assert_eq!(
            AppError::Validation("end before start".to_owned()).feedback(),
            Feedback::Inline
        );
        assert_eq!(
            AppError::Persistence("write failed".to_owned()).feedback(),
            Feedback::Dialog
        );
        assert!(AppError::Notification("smtp down".to_owned()).is_silent());
        assert!(AppError::Subscription("feed closed".to_owned()).is_silent());
    }

    #[test]
    fn feedback_serializes_as_snake_case() {
        let value = serde_json::to_value(Feedback::Snackbar).unwrap_or_default();
        assert_eq!(value, serde_json::json!("snackbar"));
    }
}
