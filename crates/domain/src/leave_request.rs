use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use staffhub_core::{AppError, AppResult, UserId};

use crate::entity::{dedup_users, require_text};
use crate::{ActionType, CollectionId, DateRange, Entity, EntityFields, OrderBy};

/// Leave request awaiting or past manager review.
pub type LeaveRequest = Entity<LeaveRequestFields>;

/// Domain fields of a leave request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequestFields {
    /// Leave category, e.g. `Annual` or `Sick`.
    pub leave_type: String,
    /// First instant of leave.
    pub start: DateTime<Utc>,
    /// Last instant of leave.
    pub end: DateTime<Utc>,
    /// Working hours taken.
    pub hours: f64,
    /// Optional reason.
    #[serde(default)]
    pub reason: Option<String>,
    /// Reviewing manager.
    pub manager: UserId,
    /// Requesting user.
    pub user: UserId,
}

impl EntityFields for LeaveRequestFields {
    const COLLECTION: CollectionId = CollectionId::LeaveRequests;
    const OWNER_FIELD: Option<&'static str> = Some("user");

    fn validate(&self) -> AppResult<()> {
        DateRange::new(self.start, self.end)?;
        require_text("leave type", &self.leave_type)?;
        if !self.hours.is_finite() || self.hours <= 0.0 {
            return Err(AppError::Validation(
                "leave hours must be greater than zero".to_owned(),
            ));
        }

        Ok(())
    }

    fn title(&self) -> String {
        format!(
            "{} leave from {}",
            self.leave_type,
            self.start.format("%Y-%m-%d")
        )
    }

    fn creation_action() -> ActionType {
        ActionType::Submitted
    }

    fn allows_status(status: ActionType) -> bool {
        matches!(status, ActionType::Approved | ActionType::Rejected)
    }

    fn default_order() -> OrderBy {
        OrderBy::desc("start")
    }

    fn owner(&self) -> Option<&UserId> {
        Some(&self.user)
    }

    fn subscribers(&self) -> Vec<UserId> {
        dedup_users([self.user.clone(), self.manager.clone()])
    }
}
