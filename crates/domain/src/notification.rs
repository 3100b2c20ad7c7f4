use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use staffhub_core::UserId;

use crate::{ActionType, CollectionId, DocumentId};

/// What happened to the entity a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Entity was created.
    Created,
    /// Entity fields were updated.
    Updated,
    /// Entity was deleted.
    Deleted,
    /// Workflow status changed.
    StatusChanged,
    /// A comment was appended.
    Commented,
}

impl NotificationKind {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::StatusChanged => "status_changed",
            Self::Commented => "commented",
        }
    }

    /// Returns the verb used in notification titles.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::StatusChanged => "changed the status of",
            Self::Commented => "commented on",
        }
    }
}

impl Display for NotificationKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A notification addressed to one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    /// Event kind.
    pub kind: NotificationKind,
    /// Collection of the entity.
    pub collection: CollectionId,
    /// Entity id.
    pub entity_id: DocumentId,
    /// Receiving user.
    pub recipient: UserId,
    /// Acting user.
    pub sender: UserId,
    /// Acting user's display name.
    pub sender_name: String,
    /// One-line summary.
    pub title: String,
    /// Optional longer text, such as a comment body.
    #[serde(default)]
    pub body: Option<String>,
    /// New workflow status for status changes.
    #[serde(default)]
    pub status: Option<ActionType>,
    /// Snapshot of the entity at dispatch time.
    #[serde(default)]
    pub data: Value,
    /// Store time of the change the record announces.
    pub created_at: DateTime<Utc>,
}

/// Union of subscribers and explicit recipients, minus the actor, sorted.
#[must_use]
pub fn compute_recipients(
    subscribers: &[UserId],
    explicit_notify_users: &[UserId],
    actor: &UserId,
) -> Vec<UserId> {
    subscribers
        .iter()
        .chain(explicit_notify_users.iter())
        .filter(|user| *user != actor)
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
