use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use staffhub_core::{AppError, AppResult, UserId};

/// Entry kind in an entity's action log.
///
/// The last entry of a workflow-bearing entity is its current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    /// Entity was created.
    Create,
    /// Entity fields were updated.
    Update,
    /// Request was submitted for review.
    Submitted,
    /// Request was raised and awaits a manager.
    Requested,
    /// Request was approved.
    Approved,
    /// Request was rejected.
    Rejected,
    /// Approved claim was paid out.
    Paid,
}

impl ActionType {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Submitted => "SUBMITTED",
            Self::Requested => "REQUESTED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Paid => "PAID",
        }
    }

    /// Returns whether the action is a workflow status rather than a bookkeeping entry.
    #[must_use]
    pub fn is_status(&self) -> bool {
        !matches!(self, Self::Create | Self::Update)
    }

    /// Checks that `self` may be appended after the current status.
    pub fn ensure_can_follow(&self, current: Option<ActionType>) -> AppResult<()> {
        let allowed = match self {
            Self::Approved | Self::Rejected => {
                matches!(current, Some(Self::Submitted | Self::Requested))
            }
            Self::Paid => current == Some(Self::Approved),
            Self::Create | Self::Update | Self::Submitted | Self::Requested => {
                return Err(AppError::Validation(format!(
                    "'{self}' is not a status transition"
                )));
            }
        };

        if allowed {
            return Ok(());
        }

        let current = current.map_or_else(|| "none".to_owned(), |action| action.to_string());
        Err(AppError::Conflict(format!(
            "cannot move from '{current}' to '{self}'"
        )))
    }
}

impl Display for ActionType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "SUBMITTED" => Ok(Self::Submitted),
            "REQUESTED" => Ok(Self::Requested),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            "PAID" => Ok(Self::Paid),
            _ => Err(AppError::Validation(format!(
                "unknown action type '{value}'"
            ))),
        }
    }
}

/// One entry in an entity's append-only action log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEntry {
    action_type: ActionType,
    actioned_at: DateTime<Utc>,
    actioned_by: UserId,
}

impl ActionEntry {
    /// Creates an action entry.
    #[must_use]
    pub fn new(action_type: ActionType, actioned_at: DateTime<Utc>, actioned_by: UserId) -> Self {
        Self {
            action_type,
            actioned_at,
            actioned_by,
        }
    }

    /// Returns action type.
    #[must_use]
    pub fn action_type(&self) -> ActionType {
        self.action_type
    }

    /// Returns when the action happened.
    #[must_use]
    pub fn actioned_at(&self) -> DateTime<Utc> {
        self.actioned_at
    }

    /// Returns who performed the action.
    #[must_use]
    pub fn actioned_by(&self) -> &UserId {
        &self.actioned_by
    }
}
