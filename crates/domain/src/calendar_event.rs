use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use staffhub_core::{AppError, AppResult, UserId};

use crate::entity::{dedup_users, require_text};
use crate::{CollectionId, DateRange, DocumentId, Entity, EntityFields, OrderBy};

/// Staff calendar event.
pub type CalendarEvent = Entity<EventFields>;

/// Domain fields of a staff calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFields {
    /// Whether the event spans whole days.
    pub all_day: bool,
    /// Free-form details.
    #[serde(default)]
    pub details: String,
    /// Event type, e.g. `Annual Leave` or `Training`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Start instant.
    pub start: DateTime<Utc>,
    /// End instant, never earlier than `start`.
    pub end: DateTime<Utc>,
    /// Branch locations the event applies to.
    pub locations: Vec<DocumentId>,
    /// Users following the event.
    #[serde(default)]
    pub subscribers: Vec<UserId>,
    /// Creator.
    pub user: UserId,
}

impl EventFields {
    /// Returns the event's date range.
    pub fn range(&self) -> AppResult<DateRange> {
        DateRange::new(self.start, self.end)
    }
}

impl EntityFields for EventFields {
    const COLLECTION: CollectionId = CollectionId::Events;
    const OWNER_FIELD: Option<&'static str> = Some("user");

    fn validate(&self) -> AppResult<()> {
        self.range()?;
        require_text("event type", &self.event_type)?;
        if self.locations.is_empty() {
            return Err(AppError::Validation(
                "event must apply to at least one location".to_owned(),
            ));
        }

        Ok(())
    }

    fn title(&self) -> String {
        let details = self.details.trim();
        if details.is_empty() {
            return self.event_type.clone();
        }

        format!("{} - {details}", self.event_type)
    }

    fn default_order() -> OrderBy {
        OrderBy::asc("start")
    }

    fn owner(&self) -> Option<&UserId> {
        Some(&self.user)
    }

    fn subscribers(&self) -> Vec<UserId> {
        dedup_users(self.subscribers.iter().cloned())
    }
}
