use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use staffhub_core::{AppResult, UserId};

use crate::entity::require_text;
use crate::{CollectionId, Entity, EntityFields};

/// News feed promotion.
pub type Promotion = Entity<PromotionFields>;

/// Domain fields of a promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionFields {
    /// Headline.
    pub title: String,
    /// Body text.
    pub body: String,
    /// When the promotion stops being shown.
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    /// Author.
    pub user: UserId,
}

impl PromotionFields {
    /// Returns whether the promotion has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|expiry| expiry <= now)
    }
}

impl EntityFields for PromotionFields {
    const COLLECTION: CollectionId = CollectionId::Promotions;
    const OWNER_FIELD: Option<&'static str> = Some("user");

    fn validate(&self) -> AppResult<()> {
        require_text("promotion title", &self.title)?;
        require_text("promotion body", &self.body)
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn owner(&self) -> Option<&UserId> {
        Some(&self.user)
    }
}
