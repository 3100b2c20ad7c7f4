use serde::{Deserialize, Serialize};
use staffhub_core::{AppError, AppResult};

use crate::entity::require_text;
use crate::{CollectionId, DocumentId, Entity, EntityFields, ForeignKey, OrderBy};

/// Staff directory profile.
pub type UserProfile = Entity<UserProfileFields>;
/// Branch location.
pub type Location = Entity<LocationFields>;

/// Domain fields of a staff profile. The document id is the user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileFields {
    /// Whether the account is active.
    pub active: bool,
    /// Work email.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Job title.
    pub title: String,
    /// Desk phone extension.
    #[serde(default)]
    pub extension: Option<String>,
    /// Mobile number.
    #[serde(default)]
    pub phone: Option<String>,
    /// Home branch.
    pub location: DocumentId,
    /// Whether the user currently works from home.
    #[serde(default)]
    pub work_from_home: bool,
}

impl UserProfileFields {
    /// Returns `first last`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

const USER_FOREIGN_KEYS: &[ForeignKey] = &[ForeignKey {
    field: "location",
    target: CollectionId::Locations,
}];

impl EntityFields for UserProfileFields {
    const COLLECTION: CollectionId = CollectionId::Users;

    fn validate(&self) -> AppResult<()> {
        require_text("first name", &self.first_name)?;
        require_text("last name", &self.last_name)?;
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
            _ => Err(AppError::Validation(format!(
                "'{email}' is not a valid email address"
            ))),
        }
    }

    fn title(&self) -> String {
        self.full_name()
    }

    fn default_order() -> OrderBy {
        OrderBy::asc("firstName")
    }

    fn foreign_keys() -> &'static [ForeignKey] {
        USER_FOREIGN_KEYS
    }
}

/// Domain fields of a branch location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFields {
    /// Branch name.
    pub branch: String,
    /// Street address.
    pub address: String,
    /// Reception phone.
    pub phone: String,
    /// State or territory.
    pub state: String,
    /// IANA timezone, e.g. `Australia/Brisbane`.
    pub timezone: String,
}

impl EntityFields for LocationFields {
    const COLLECTION: CollectionId = CollectionId::Locations;

    fn validate(&self) -> AppResult<()> {
        require_text("branch", &self.branch)?;
        require_text("state", &self.state)?;
        if !self.timezone.contains('/') {
            return Err(AppError::Validation(format!(
                "'{}' is not an IANA timezone",
                self.timezone
            )));
        }

        Ok(())
    }

    fn title(&self) -> String {
        self.branch.clone()
    }

    fn default_order() -> OrderBy {
        OrderBy::asc("branch")
    }
}
