use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use staffhub_core::{Actor, AppError, AppResult};
use staffhub_domain::{
    ACTIONS_FIELD, ActionEntry, ActionType, Attachment, COMMENTS_FIELD, COUNT_FIELD,
    CollectionId, Comment, CommentId, CommentInput, CounterScope, DOCUMENTS_FIELD, DeletePolicy,
    DocumentId, Entity, EntityFields, FieldPath, FieldTransform, METADATA_FIELD, StoredDocument,
};
use tracing::info;

use crate::store_ports::{DocumentStore, WriteBatch};

mod outcome;

pub use outcome::MutationOutcome;

/// Replacement domain fields and, optionally, a new attachment list.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateInput<F> {
    /// New domain fields.
    pub fields: F,
    /// New attachment list; `None` keeps the current one.
    pub attachments: Option<Vec<Attachment>>,
}

/// Validated, server-timestamped writes of business entities.
#[derive(Clone)]
pub struct MutationPipeline {
    store: Arc<dyn DocumentStore>,
}

impl MutationPipeline {
    /// Creates a mutation pipeline.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Persists a new entity together with its counters in one commit.
    pub async fn create<F: EntityFields>(&self, actor: &Actor, fields: F) -> AppResult<Entity<F>> {
        let draft = Entity::draft(fields)?;
        let at = self.store.server_time().await?;
        let id = self.store.allocate_id(F::COLLECTION)?;
        let entity = draft.stamp_created(id.clone(), at, actor.user_id().clone())?;

        let mut batch = WriteBatch::new();
        batch.create(F::COLLECTION, id.clone(), entity.to_storage_record()?);
        for scope in counter_scopes(&entity) {
            add_counter_ops(&mut batch, F::COLLECTION, &scope, &id, 1)?;
        }
        self.store.commit(batch).await?;

        info!(
            collection = %F::COLLECTION,
            document_id = %id,
            user_id = %actor.user_id(),
            "entity created"
        );
        Ok(entity)
    }

    /// Writes new domain fields. Comments and the action log are never rewritten.
    ///
    /// A changed owner moves the id between owner counters in the same commit.
    pub async fn update<F: EntityFields>(
        &self,
        actor: &Actor,
        entity: &Entity<F>,
        input: UpdateInput<F>,
    ) -> AppResult<Entity<F>> {
        let id = entity.require_id()?.clone();
        let stored = self.fetch_document::<F>(&id).await?;
        let stored_owner = owner_value::<F>(&stored);
        let previous = Entity::<F>::from_storage(stored)?;

        let mut updated = entity.clone();
        updated.replace_fields(input.fields)?;
        if let Some(attachments) = input.attachments {
            updated.replace_attachments(attachments);
        }

        let at = self.store.server_time().await?;
        updated.restamp(at, actor.user_id().clone())?;

        let record = updated.to_storage_record()?;
        let values = record
            .as_object()
            .into_iter()
            .flatten()
            .filter(|(key, _)| key.as_str() != COMMENTS_FIELD && key.as_str() != ACTIONS_FIELD)
            .map(|(key, value)| (FieldPath::field(key.as_str()), value.clone()))
            .collect::<Vec<_>>();

        let previous_owner = previous.fields().owner();
        let next_owner = updated.fields().owner();
        let owner_moved = F::COLLECTION.is_counted() && previous_owner != next_owner;

        let mut batch = WriteBatch::new();
        if owner_moved {
            expect_owner::<F>(&mut batch, &id, stored_owner);
        }
        batch.merge(F::COLLECTION, id.clone(), values);
        if owner_moved {
            if let Some(owner) = previous_owner {
                let scope = CounterScope::Owner(owner.clone());
                add_counter_ops(&mut batch, F::COLLECTION, &scope, &id, -1)?;
            }
            if let Some(owner) = next_owner {
                let scope = CounterScope::Owner(owner.clone());
                add_counter_ops(&mut batch, F::COLLECTION, &scope, &id, 1)?;
            }
        }
        self.store.commit(batch).await?;

        info!(
            collection = %F::COLLECTION,
            document_id = %id,
            user_id = %actor.user_id(),
            owner_moved,
            "entity updated"
        );
        Ok(updated)
    }

    /// Appends a workflow status to the action log.
    pub async fn transition<F: EntityFields>(
        &self,
        actor: &Actor,
        entity: &Entity<F>,
        action: ActionType,
    ) -> AppResult<Entity<F>> {
        let id = entity.require_id()?.clone();
        if !action.is_status() {
            return Err(AppError::Validation(format!(
                "'{action}' is not a status transition"
            )));
        }
        if !F::allows_status(action) {
            return Err(AppError::Conflict(format!(
                "{} records cannot be marked '{action}'",
                F::COLLECTION.label()
            )));
        }

        let stored = self.fetch_document::<F>(&id).await?;
        let read_actions = stored
            .data()
            .get(ACTIONS_FIELD)
            .cloned()
            .unwrap_or(Value::Null);
        let current = Entity::<F>::from_storage(stored)?;
        action.ensure_can_follow(current.status())?;

        let at = self.store.server_time().await?;
        let entry = ActionEntry::new(action, at, actor.user_id().clone());
        let mut updated = current;
        updated.push_action(entry.clone());
        updated.restamp(at, actor.user_id().clone())?;

        // The status read above must still be the last entry when the commit lands.
        let mut batch = WriteBatch::new();
        batch
            .expect(
                F::COLLECTION,
                id.clone(),
                FieldPath::field(ACTIONS_FIELD),
                read_actions,
            )
            .transform(
                F::COLLECTION,
                id.clone(),
                FieldPath::field(ACTIONS_FIELD),
                FieldTransform::ArrayUnion(vec![to_value(&entry)?]),
            );
        batch.merge(F::COLLECTION, id.clone(), vec![metadata_value(&updated)?]);
        self.store.commit(batch).await?;

        info!(
            collection = %F::COLLECTION,
            document_id = %id,
            user_id = %actor.user_id(),
            status = %action,
            "entity status changed"
        );
        Ok(updated)
    }

    /// Appends a comment with an atomic array union.
    pub async fn append_comment<F: EntityFields>(
        &self,
        actor: &Actor,
        entity: &Entity<F>,
        input: CommentInput,
    ) -> AppResult<(Entity<F>, Comment)> {
        let id = entity.require_id()?.clone();
        input.validate()?;

        let at = self.store.server_time().await?;
        let comment = Comment::compose(input, at)?;
        let mut updated = entity.clone();
        updated.push_comment(comment.clone());
        updated.restamp(at, actor.user_id().clone())?;

        let mut batch = WriteBatch::new();
        batch.transform(
            F::COLLECTION,
            id.clone(),
            FieldPath::field(COMMENTS_FIELD),
            FieldTransform::ArrayUnion(vec![to_value(&comment)?]),
        );
        batch.merge(F::COLLECTION, id.clone(), vec![metadata_value(&updated)?]);
        self.store.commit(batch).await?;

        info!(
            collection = %F::COLLECTION,
            document_id = %id,
            comment_id = %comment.comment_id(),
            user_id = %actor.user_id(),
            "comment appended"
        );
        Ok((updated, comment))
    }

    /// Adds or removes the actor's like. Returns whether the comment is now liked.
    pub async fn toggle_comment_like<F: EntityFields>(
        &self,
        actor: &Actor,
        entity: &Entity<F>,
        comment_id: &CommentId,
    ) -> AppResult<bool> {
        let id = entity.require_id()?.clone();
        let current = self.load::<F>(&id).await?;
        let comment = current.comment(comment_id).ok_or_else(|| {
            AppError::NotFound(format!(
                "comment '{comment_id}' does not exist on {} '{id}'",
                F::COLLECTION
            ))
        })?;

        let liked = !comment.is_liked_by(actor.user_id());
        let user = Value::from(actor.user_id().as_str());
        let transform = if liked {
            FieldTransform::ArrayUnion(vec![user])
        } else {
            FieldTransform::ArrayRemove(vec![user])
        };

        let mut batch = WriteBatch::new();
        batch.transform(
            F::COLLECTION,
            id.clone(),
            FieldPath::field(COMMENTS_FIELD)
                .then_where("commentId", comment_id.as_str())
                .then_field("likes"),
            transform,
        );
        self.store.commit(batch).await?;

        info!(
            collection = %F::COLLECTION,
            document_id = %id,
            comment_id = %comment_id,
            user_id = %actor.user_id(),
            liked,
            "comment like toggled"
        );
        Ok(liked)
    }

    /// Removes a hard-deletable entity and its counter entries in one commit.
    /// Returns the store time of the deletion.
    ///
    /// Counter scopes come from the stored document, not the caller's copy.
    pub async fn delete<F: EntityFields>(
        &self,
        actor: &Actor,
        entity: &Entity<F>,
    ) -> AppResult<DateTime<Utc>> {
        let id = entity.require_id()?.clone();
        if F::COLLECTION.delete_policy() == DeletePolicy::Retain {
            return Err(AppError::Conflict(format!(
                "{} records are retained and cannot be deleted",
                F::COLLECTION.label()
            )));
        }

        let stored = self.fetch_document::<F>(&id).await?;
        let stored_owner = owner_value::<F>(&stored);
        let current = Entity::<F>::from_storage(stored)?;
        let at = self.store.server_time().await?;

        let mut batch = WriteBatch::new();
        if F::COLLECTION.is_counted() {
            expect_owner::<F>(&mut batch, &id, stored_owner);
        }
        batch.delete(F::COLLECTION, id.clone());
        for scope in counter_scopes(&current) {
            add_counter_ops(&mut batch, F::COLLECTION, &scope, &id, -1)?;
        }
        self.store.commit(batch).await?;

        info!(
            collection = %F::COLLECTION,
            document_id = %id,
            user_id = %actor.user_id(),
            "entity deleted"
        );
        Ok(at)
    }

    async fn fetch_document<F: EntityFields>(&self, id: &DocumentId) -> AppResult<StoredDocument> {
        self.store.get(F::COLLECTION, id).await?.ok_or_else(|| {
            AppError::NotFound(format!("{} '{id}' does not exist", F::COLLECTION))
        })
    }

    async fn load<F: EntityFields>(&self, id: &DocumentId) -> AppResult<Entity<F>> {
        Entity::from_storage(self.fetch_document::<F>(id).await?)
    }
}

/// Raw owner value of a stored document, `null` when the kind has no owner.
fn owner_value<F: EntityFields>(document: &StoredDocument) -> Value {
    F::OWNER_FIELD
        .and_then(|field| document.data().get(field))
        .cloned()
        .unwrap_or(Value::Null)
}

fn expect_owner<F: EntityFields>(batch: &mut WriteBatch, id: &DocumentId, owner: Value) {
    if let Some(field) = F::OWNER_FIELD {
        batch.expect(F::COLLECTION, id.clone(), FieldPath::field(field), owner);
    }
}

fn counter_scopes<F: EntityFields>(entity: &Entity<F>) -> Vec<CounterScope> {
    if !F::COLLECTION.is_counted() {
        return Vec::new();
    }

    let mut scopes = vec![CounterScope::Collection];
    if let Some(owner) = entity.fields().owner() {
        scopes.push(CounterScope::Owner(owner.clone()));
    }
    scopes
}

fn add_counter_ops(
    batch: &mut WriteBatch,
    collection: CollectionId,
    scope: &CounterScope,
    id: &DocumentId,
    delta: i64,
) -> AppResult<()> {
    let counter_id = scope.document_id(collection)?;
    let member = Value::from(id.as_str());
    let membership = if delta > 0 {
        FieldTransform::ArrayUnion(vec![member])
    } else {
        FieldTransform::ArrayRemove(vec![member])
    };

    batch
        .upsert_transform(
            CollectionId::Counters,
            counter_id.clone(),
            FieldPath::field("collection"),
            FieldTransform::Set(Value::from(collection.as_str())),
        )
        .upsert_transform(
            CollectionId::Counters,
            counter_id.clone(),
            FieldPath::field(COUNT_FIELD),
            FieldTransform::Increment(delta),
        )
        .upsert_transform(
            CollectionId::Counters,
            counter_id,
            FieldPath::field(DOCUMENTS_FIELD),
            membership,
        );
    Ok(())
}

fn metadata_value<F: EntityFields>(entity: &Entity<F>) -> AppResult<(FieldPath, Value)> {
    let metadata = entity
        .metadata()
        .ok_or_else(|| AppError::Internal(format!("{} entity has no metadata", F::COLLECTION)))?;
    Ok((FieldPath::field(METADATA_FIELD), to_value(metadata)?))
}

fn to_value(value: &impl serde::Serialize) -> AppResult<Value> {
    serde_json::to_value(value)
        .map_err(|error| AppError::Internal(format!("failed to serialize write: {error}")))
}
