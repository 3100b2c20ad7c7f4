use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use staffhub_core::{AppError, AppResult, UserId};

use crate::entity::{dedup_users, require_text};
use crate::{CollectionId, DocumentId, Entity, EntityFields, ForeignKey, OrderBy};

/// Customer project.
pub type Project = Entity<ProjectFields>;

/// Domain fields of a customer project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFields {
    /// Project name.
    pub name: String,
    /// Customer the project is delivered for.
    pub customer: DocumentId,
    /// Accountable staff member.
    pub owner: UserId,
    /// Other staff on the project.
    #[serde(default)]
    pub members: Vec<UserId>,
    /// Optional due date.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Optional contract value in cents.
    #[serde(default)]
    pub value_cents: Option<i64>,
}

const PROJECT_FOREIGN_KEYS: &[ForeignKey] = &[ForeignKey {
    field: "customer",
    target: CollectionId::Customers,
}];

impl EntityFields for ProjectFields {
    const COLLECTION: CollectionId = CollectionId::Projects;
    const OWNER_FIELD: Option<&'static str> = Some("owner");

    fn validate(&self) -> AppResult<()> {
        require_text("project name", &self.name)?;
        if self.value_cents.is_some_and(|value| value < 0) {
            return Err(AppError::Validation(
                "project value must not be negative".to_owned(),
            ));
        }

        Ok(())
    }

    fn title(&self) -> String {
        self.name.clone()
    }

    fn default_order() -> OrderBy {
        OrderBy::asc("name")
    }

    fn foreign_keys() -> &'static [ForeignKey] {
        PROJECT_FOREIGN_KEYS
    }

    fn owner(&self) -> Option<&UserId> {
        Some(&self.owner)
    }

    fn subscribers(&self) -> Vec<UserId> {
        dedup_users(
            std::iter::once(self.owner.clone()).chain(self.members.iter().cloned()),
        )
    }
}
