use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::StreamExt;
use serde_json::Value;
use staffhub_domain::{CollectionId, Entity, EntityFields, ForeignKey, StoredDocument};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::options::EntityPredicate;
use super::state::{ApplicationState, SliceRecords};
use super::subscription::{ChannelCloser, ChannelStatus, Snapshot, SubscriptionId};
use crate::store_ports::SnapshotFeed;

struct PublisherInner<F> {
    snapshots: Option<watch::Sender<Option<Snapshot<F>>>>,
    status: Option<watch::Sender<ChannelStatus>>,
    sequence: u64,
}

/// Emission side of a channel. Every emission and state write happens under
/// one lock, and `close` clears the senders under the same lock.
pub(super) struct Publisher<F> {
    id: SubscriptionId,
    state: ApplicationState,
    slice: Option<CollectionId>,
    inner: Mutex<PublisherInner<F>>,
}

impl<F: EntityFields> Publisher<F> {
    pub(super) fn new(
        id: SubscriptionId,
        state: ApplicationState,
        slice: Option<CollectionId>,
        snapshots: watch::Sender<Option<Snapshot<F>>>,
        status: watch::Sender<ChannelStatus>,
    ) -> Self {
        Self {
            id,
            state,
            slice,
            inner: Mutex::new(PublisherInner {
                snapshots: Some(snapshots),
                status: Some(status),
                sequence: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PublisherInner<F>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Emits a snapshot. Returns `false` once the channel is closed.
    fn emit(&self, items: Vec<Entity<F>>, records: HashMap<String, Value>) -> bool {
        let mut inner = self.lock();
        let Some(snapshots) = inner.snapshots.as_ref() else {
            return false;
        };

        let sequence = inner.sequence + 1;
        snapshots.send_replace(Some(Snapshot { sequence, items }));
        inner.sequence = sequence;
        if let Some(status) = inner.status.as_ref() {
            status.send_if_modified(|current| {
                let changed = *current != ChannelStatus::Live;
                *current = ChannelStatus::Live;
                changed
            });
        }
        if let Some(collection) = self.slice {
            self.state.publish(collection, self.id, records);
        }

        true
    }

    fn degrade(&self) {
        if let Some(status) = self.lock().status.as_ref() {
            status.send_replace(ChannelStatus::Degraded);
        }
    }
}

impl<F: EntityFields> ChannelCloser for Publisher<F> {
    fn close(&self) {
        let mut inner = self.lock();
        if inner.snapshots.take().is_none() {
            return;
        }
        inner.status = None;
        if let Some(collection) = self.slice {
            self.state.release(collection, self.id);
        }
        debug!(subscription = %self.id, "channel disposed");
    }
}

/// Result of turning raw documents into entities.
pub(super) enum Projection<F> {
    /// Entities ready to emit, plus the raw records for state publication.
    Ready(Vec<Entity<F>>, HashMap<String, Value>),
    /// A join target slice is not hydrated yet.
    Deferred(CollectionId),
}

/// Parses, filters and joins documents in store order.
pub(super) fn project<F: EntityFields>(
    documents: &[StoredDocument],
    predicate: Option<&EntityPredicate<F>>,
    joins: &[ForeignKey],
    state: &ApplicationState,
    defer_missing_joins: bool,
) -> Projection<F> {
    let mut slices: Vec<(&ForeignKey, SliceRecords)> = Vec::with_capacity(joins.len());
    for foreign_key in joins {
        match state.slice(foreign_key.target) {
            Some(records) => slices.push((foreign_key, records)),
            None if defer_missing_joins => return Projection::Deferred(foreign_key.target),
            None => {}
        }
    }

    let mut items = Vec::with_capacity(documents.len());
    let mut records = HashMap::with_capacity(documents.len());
    for document in documents {
        let mut entity = match Entity::<F>::from_storage(document.clone()) {
            Ok(entity) => entity,
            Err(error) => {
                warn!(
                    collection = %F::COLLECTION,
                    document_id = %document.id(),
                    error = %error,
                    "skipping malformed document"
                );
                continue;
            }
        };

        if let Some(predicate) = predicate
            && !predicate(&entity)
        {
            continue;
        }

        for (foreign_key, slice) in &slices {
            if let Some(joined) = document
                .data()
                .get(foreign_key.field)
                .and_then(Value::as_str)
                .and_then(|foreign_id| slice.get(foreign_id))
            {
                entity.insert_joined(foreign_key.field, joined.clone());
            }
        }

        let mut record = document.data().clone();
        if let Some(object) = record.as_object_mut() {
            object.insert("id".to_owned(), Value::from(document.id().as_str()));
        }
        records.insert(document.id().as_str().to_owned(), record);
        items.push(entity);
    }

    Projection::Ready(items, records)
}

pub(super) struct ChannelTask<F> {
    pub(super) id: SubscriptionId,
    pub(super) feed: SnapshotFeed,
    pub(super) predicate: Option<EntityPredicate<F>>,
    pub(super) joins: Vec<ForeignKey>,
    pub(super) state: ApplicationState,
    pub(super) publisher: Arc<Publisher<F>>,
    pub(super) token: CancellationToken,
}

/// Drives one channel until it is disposed or its feed ends.
pub(super) async fn run<F: EntityFields>(task: ChannelTask<F>) {
    let ChannelTask {
        id,
        mut feed,
        predicate,
        joins,
        state,
        publisher,
        token,
    } = task;

    let mut join_changes = state.changes();
    let watch_joins = !joins.is_empty();
    let mut latest: Option<Vec<StoredDocument>> = None;
    let mut seen_joins = Vec::new();

    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => break,
            next = feed.next() => match next {
                Some(Ok(snapshot)) => latest = Some(snapshot.documents),
                Some(Err(error)) => {
                    warn!(
                        subscription = %id,
                        collection = %F::COLLECTION,
                        error = %error,
                        "channel feed reported an error"
                    );
                    publisher.degrade();
                    continue;
                }
                None => {
                    warn!(subscription = %id, collection = %F::COLLECTION, "channel feed closed");
                    publisher.degrade();
                    break;
                }
            },
            changed = join_changes.changed(), if watch_joins => {
                if changed.is_err() {
                    break;
                }
                if same_slices(&join_slices(&state, &joins), &seen_joins) {
                    continue;
                }
            }
        }

        let Some(documents) = latest.as_deref() else {
            continue;
        };

        seen_joins = join_slices(&state, &joins);
        match project::<F>(documents, predicate.as_ref(), &joins, &state, true) {
            Projection::Ready(items, records) => {
                if !publisher.emit(items, records) {
                    break;
                }
            }
            Projection::Deferred(target) => {
                debug!(
                    subscription = %id,
                    collection = %F::COLLECTION,
                    waiting_for = %target,
                    "deferring snapshot until join state is loaded"
                );
            }
        }
    }
}

fn join_slices(state: &ApplicationState, joins: &[ForeignKey]) -> Vec<Option<SliceRecords>> {
    joins
        .iter()
        .map(|foreign_key| state.slice(foreign_key.target))
        .collect()
}

fn same_slices(current: &[Option<SliceRecords>], seen: &[Option<SliceRecords>]) -> bool {
    current.len() == seen.len()
        && current
            .iter()
            .zip(seen)
            .all(|pair| match pair {
                (Some(current), Some(seen)) => Arc::ptr_eq(current, seen),
                (None, None) => true,
                _ => false,
            })
}
