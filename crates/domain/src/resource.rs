use serde::{Deserialize, Serialize};
use staffhub_core::{AppError, AppResult};

use crate::entity::require_text;
use crate::{CollectionId, Entity, EntityFields, OrderBy};

/// Shared link filed under a folder.
pub type Resource = Entity<ResourceFields>;

/// Domain fields of a shared resource link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceFields {
    /// Display name.
    pub name: String,
    /// Folder grouping.
    pub folder: String,
    /// Target URL.
    pub link: String,
}

impl EntityFields for ResourceFields {
    const COLLECTION: CollectionId = CollectionId::Resources;

    fn validate(&self) -> AppResult<()> {
        require_text("resource name", &self.name)?;
        require_text("resource folder", &self.folder)?;
        let link = self.link.trim();
        if !(link.starts_with("https://") || link.starts_with("http://")) {
            return Err(AppError::Validation(format!(
                "resource link '{link}' must be an http(s) URL"
            )));
        }

        Ok(())
    }

    fn title(&self) -> String {
        format!("{}/{}", self.folder, self.name)
    }

    fn default_order() -> OrderBy {
        OrderBy::asc("name")
    }
}
