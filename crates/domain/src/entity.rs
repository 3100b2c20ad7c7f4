use std::collections::BTreeMap;
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use staffhub_core::{AppError, AppResult, UserId};

use crate::{
    ActionEntry, ActionType, Attachment, CollectionId, Comment, CommentId, DocumentId, OrderBy,
    StoredDocument,
};

/// Storage key of the metadata map.
pub const METADATA_FIELD: &str = "metadata";
/// Storage key of the action log.
pub const ACTIONS_FIELD: &str = "actions";
/// Storage key of the comment thread.
pub const COMMENTS_FIELD: &str = "comments";
/// Storage key of entity attachments.
pub const ATTACHMENTS_FIELD: &str = "attachments";

/// Creation and last-update stamps. `created_at` never exceeds `updated_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "MetadataRecord")]
pub struct Metadata {
    created_at: DateTime<Utc>,
    created_by: UserId,
    updated_at: DateTime<Utc>,
    updated_by: UserId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataRecord {
    created_at: DateTime<Utc>,
    created_by: UserId,
    updated_at: DateTime<Utc>,
    updated_by: UserId,
}

impl TryFrom<MetadataRecord> for Metadata {
    type Error = AppError;

    fn try_from(record: MetadataRecord) -> Result<Self, Self::Error> {
        if record.updated_at < record.created_at {
            return Err(AppError::Validation(
                "metadata updatedAt must not precede createdAt".to_owned(),
            ));
        }

        Ok(Self {
            created_at: record.created_at,
            created_by: record.created_by,
            updated_at: record.updated_at,
            updated_by: record.updated_by,
        })
    }
}

impl Metadata {
    /// Metadata for a freshly created entity.
    #[must_use]
    pub fn created(at: DateTime<Utc>, by: UserId) -> Self {
        Self {
            created_at: at,
            created_by: by.clone(),
            updated_at: at,
            updated_by: by,
        }
    }

    /// Returns a copy with the update stamp moved forward. A server time earlier
    /// than the current stamp keeps the current stamp.
    #[must_use]
    pub fn restamped(&self, at: DateTime<Utc>, by: UserId) -> Self {
        Self {
            created_at: self.created_at,
            created_by: self.created_by.clone(),
            updated_at: at.max(self.updated_at),
            updated_by: by,
        }
    }

    /// Returns creation time.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns creator.
    #[must_use]
    pub fn created_by(&self) -> &UserId {
        &self.created_by
    }

    /// Returns last update time.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns last updater.
    #[must_use]
    pub fn updated_by(&self) -> &UserId {
        &self.updated_by
    }
}

/// Field holding the id of a document in another collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    /// Field of this entity holding the foreign id.
    pub field: &'static str,
    /// Collection the id points into.
    pub target: CollectionId,
}

/// Domain fields of one business kind.
pub trait EntityFields:
    Serialize + DeserializeOwned + Clone + Debug + PartialEq + Send + Sync + 'static
{
    /// Collection storing this kind.
    const COLLECTION: CollectionId;

    /// Validates kind-specific invariants.
    fn validate(&self) -> AppResult<()>;

    /// Short human-readable title used in notifications.
    fn title(&self) -> String;

    /// Storage field naming the owning user, for owner-scoped queries.
    const OWNER_FIELD: Option<&'static str> = None;

    /// First action of every persisted entity of this kind.
    fn creation_action() -> ActionType {
        ActionType::Create
    }

    /// Whether this kind's workflow accepts `status` at all.
    fn allows_status(_status: ActionType) -> bool {
        false
    }

    /// Presentation order for channels without an explicit ordering.
    fn default_order() -> OrderBy {
        OrderBy::desc("metadata.createdAt")
    }

    /// Fields denormalized from other collections.
    fn foreign_keys() -> &'static [ForeignKey] {
        &[]
    }

    /// User owning the entity, used for owner-scoped views and counters.
    fn owner(&self) -> Option<&UserId> {
        None
    }

    /// Users notified about changes to the entity.
    fn subscribers(&self) -> Vec<UserId> {
        self.owner().cloned().into_iter().collect()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageRecord<F> {
    metadata: Metadata,
    actions: Vec<ActionEntry>,
    #[serde(default)]
    comments: Vec<Comment>,
    #[serde(default)]
    attachments: Vec<Attachment>,
    #[serde(flatten)]
    fields: F,
}

/// A business entity: shared bookkeeping plus kind-specific fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity<F> {
    id: Option<DocumentId>,
    metadata: Option<Metadata>,
    actions: Vec<ActionEntry>,
    comments: Vec<Comment>,
    attachments: Vec<Attachment>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    joined: BTreeMap<String, Value>,
    #[serde(flatten)]
    fields: F,
}

impl<F: EntityFields> Entity<F> {
    /// Builds an unsaved entity from validated fields.
    pub fn draft(fields: F) -> AppResult<Self> {
        fields.validate()?;

        Ok(Self {
            id: None,
            metadata: None,
            actions: Vec::new(),
            comments: Vec::new(),
            attachments: Vec::new(),
            joined: BTreeMap::new(),
            fields,
        })
    }

    /// Rebuilds an entity from a raw stored document.
    pub fn from_storage(document: StoredDocument) -> AppResult<Self> {
        let (id, data) = document.into_parts();
        let record: StorageRecord<F> = serde_json::from_value(data).map_err(|error| {
            AppError::Persistence(format!(
                "malformed {} document '{id}': {error}",
                F::COLLECTION
            ))
        })?;

        if record.actions.is_empty() {
            return Err(AppError::Persistence(format!(
                "{} document '{id}' has an empty action log",
                F::COLLECTION
            )));
        }

        Ok(Self {
            id: Some(id),
            metadata: Some(record.metadata),
            actions: record.actions,
            comments: record.comments,
            attachments: record.attachments,
            joined: BTreeMap::new(),
            fields: record.fields,
        })
    }

    /// Serializes the entity for storage. The id is not part of the record.
    pub fn to_storage_record(&self) -> AppResult<Value> {
        let metadata = self.metadata.clone().ok_or_else(|| {
            AppError::Internal(format!(
                "{} entity has no metadata to persist",
                F::COLLECTION
            ))
        })?;

        let record = StorageRecord {
            metadata,
            actions: self.actions.clone(),
            comments: self.comments.clone(),
            attachments: self.attachments.clone(),
            fields: self.fields.clone(),
        };

        serde_json::to_value(record).map_err(|error| {
            AppError::Internal(format!(
                "failed to serialize {} entity: {error}",
                F::COLLECTION
            ))
        })
    }

    /// Stamps a draft as persisted under `id` with its creation action.
    pub fn stamp_created(
        mut self,
        id: DocumentId,
        at: DateTime<Utc>,
        by: UserId,
    ) -> AppResult<Self> {
        if self.id.is_some() {
            return Err(AppError::Internal(format!(
                "{} entity is already persisted",
                F::COLLECTION
            )));
        }

        self.metadata = Some(Metadata::created(at, by.clone()));
        self.actions = vec![ActionEntry::new(F::creation_action(), at, by)];
        self.id = Some(id);
        Ok(self)
    }

    /// Moves `updatedAt` forward and records the updater.
    pub fn restamp(&mut self, at: DateTime<Utc>, by: UserId) -> AppResult<()> {
        let metadata = self.metadata.as_ref().ok_or_else(|| {
            AppError::Internal(format!("{} entity has no metadata", F::COLLECTION))
        })?;
        self.metadata = Some(metadata.restamped(at, by));
        Ok(())
    }

    /// Replaces domain fields after validation.
    pub fn replace_fields(&mut self, fields: F) -> AppResult<()> {
        fields.validate()?;
        self.fields = fields;
        Ok(())
    }

    /// Replaces the attachment list.
    pub fn replace_attachments(&mut self, attachments: Vec<Attachment>) {
        self.attachments = attachments;
    }

    /// Appends an action log entry.
    pub fn push_action(&mut self, entry: ActionEntry) {
        self.actions.push(entry);
    }

    /// Appends a comment.
    pub fn push_comment(&mut self, comment: Comment) {
        self.comments.push(comment);
    }

    /// Attaches a denormalized record for a foreign key field.
    pub fn insert_joined(&mut self, field: impl Into<String>, record: Value) {
        self.joined.insert(field.into(), record);
    }

    /// Returns id, if persisted.
    #[must_use]
    pub fn id(&self) -> Option<&DocumentId> {
        self.id.as_ref()
    }

    /// Returns id or an internal error for mutations on unsaved entities.
    pub fn require_id(&self) -> AppResult<&DocumentId> {
        self.id.as_ref().ok_or_else(|| {
            AppError::Internal(format!(
                "{} entity has no id; only create accepts unsaved entities",
                F::COLLECTION
            ))
        })
    }

    /// Returns metadata, if persisted.
    #[must_use]
    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    /// Returns the action log.
    #[must_use]
    pub fn actions(&self) -> &[ActionEntry] {
        self.actions.as_slice()
    }

    /// Returns the current workflow status: the last action type.
    #[must_use]
    pub fn status(&self) -> Option<ActionType> {
        self.actions.last().map(ActionEntry::action_type)
    }

    /// Returns comments in thread order.
    #[must_use]
    pub fn comments(&self) -> &[Comment] {
        self.comments.as_slice()
    }

    /// Finds a comment by id.
    #[must_use]
    pub fn comment(&self, comment_id: &CommentId) -> Option<&Comment> {
        self.comments
            .iter()
            .find(|comment| comment.comment_id() == comment_id)
    }

    /// Finds a comment by id for local optimistic updates.
    pub fn comment_mut(&mut self, comment_id: &CommentId) -> Option<&mut Comment> {
        self.comments
            .iter_mut()
            .find(|comment| comment.comment_id() == comment_id)
    }

    /// Returns attachments.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        self.attachments.as_slice()
    }

    /// Returns a denormalized record for a foreign key field.
    #[must_use]
    pub fn joined(&self, field: &str) -> Option<&Value> {
        self.joined.get(field)
    }

    /// Returns domain fields.
    #[must_use]
    pub fn fields(&self) -> &F {
        &self.fields
    }
}

pub(crate) fn require_text(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }

    Ok(())
}

pub(crate) fn dedup_users(users: impl IntoIterator<Item = UserId>) -> Vec<UserId> {
    let mut users = users.into_iter().collect::<Vec<_>>();
    users.sort();
    users.dedup();
    users
}

#[cfg(test)]
mod tests;
