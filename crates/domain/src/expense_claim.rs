use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use staffhub_core::{AppError, AppResult, UserId};

use crate::entity::{dedup_users, require_text};
use crate::{ActionType, CollectionId, Entity, EntityFields};

/// Expense claim submitted to a manager.
pub type ExpenseClaim = Entity<ExpenseClaimFields>;

/// One reimbursable line of an expense claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseLine {
    /// Day the expense was incurred.
    pub date: NaiveDate,
    /// What was purchased.
    pub description: String,
    /// Amount in cents.
    pub amount_cents: i64,
}

/// Domain fields of an expense claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseClaimFields {
    /// Claimed expenses.
    pub expenses: Vec<ExpenseLine>,
    /// Approving manager.
    pub manager: UserId,
    /// Claimant.
    pub user: UserId,
}

impl ExpenseClaimFields {
    /// Returns the claim total in cents.
    #[must_use]
    pub fn total_cents(&self) -> i64 {
        self.expenses
            .iter()
            .map(|line| line.amount_cents)
            .fold(0_i64, i64::saturating_add)
    }
}

impl EntityFields for ExpenseClaimFields {
    const COLLECTION: CollectionId = CollectionId::ExpenseClaims;
    const OWNER_FIELD: Option<&'static str> = Some("user");

    fn validate(&self) -> AppResult<()> {
        if self.expenses.is_empty() {
            return Err(AppError::Validation(
                "expense claim must contain at least one expense".to_owned(),
            ));
        }

        for line in &self.expenses {
            require_text("expense description", &line.description)?;
            if line.amount_cents <= 0 {
                return Err(AppError::Validation(format!(
                    "expense '{}' must have a positive amount",
                    line.description.trim()
                )));
            }
        }

        Ok(())
    }

    fn title(&self) -> String {
        let total = self.total_cents();
        format!("Expense claim ${}.{:02}", total / 100, total % 100)
    }

    fn creation_action() -> ActionType {
        ActionType::Submitted
    }

    fn allows_status(status: ActionType) -> bool {
        matches!(
            status,
            ActionType::Approved | ActionType::Rejected | ActionType::Paid
        )
    }

    fn owner(&self) -> Option<&UserId> {
        Some(&self.user)
    }

    fn subscribers(&self) -> Vec<UserId> {
        dedup_users([self.user.clone(), self.manager.clone()])
    }
}
