use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use staffhub_core::{AppError, AppResult};
use staffhub_domain::{CollectionId, CollectionQuery, DocumentId, Entity, EntityFields, ForeignKey};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::store_ports::{DocumentStore, ListenTarget};

mod channel;
mod options;
mod scope;
mod state;
mod subscription;

use channel::{ChannelTask, Projection, Publisher, project};

pub use options::{EntityPredicate, SubscribeOptions};
pub use scope::SubscriptionScope;
pub use state::{ApplicationState, SliceRecords};
pub use subscription::{
    ChannelHandle, ChannelStatus, Snapshot, SnapshotStream, SnapshotWatcher, Subscription,
    SubscriptionId,
};

/// Opens realtime channels from the document store into typed snapshots.
#[derive(Clone)]
pub struct SyncService {
    store: Arc<dyn DocumentStore>,
    state: ApplicationState,
    next_id: Arc<AtomicU64>,
}

impl SyncService {
    /// Creates a synchronization service.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, state: ApplicationState) -> Self {
        Self {
            store,
            state,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Returns the shared application state.
    #[must_use]
    pub fn state(&self) -> &ApplicationState {
        &self.state
    }

    /// Opens a collection channel.
    pub async fn subscribe<F: EntityFields>(
        &self,
        options: SubscribeOptions<F>,
    ) -> AppResult<Subscription<F>> {
        if options.query.collection() != F::COLLECTION {
            return Err(AppError::Validation(format!(
                "query targets '{}' but the channel expects '{}'",
                options.query.collection(),
                F::COLLECTION
            )));
        }

        let slice = options.publish.then_some(F::COLLECTION);
        self.open_channel(
            ListenTarget::Query(options.query),
            options.predicate,
            options.joins,
            slice,
        )
        .await
    }

    /// Opens a single-document channel. Snapshots hold zero or one entity.
    pub async fn subscribe_document<F: EntityFields>(
        &self,
        id: DocumentId,
    ) -> AppResult<Subscription<F>> {
        self.open_channel(
            ListenTarget::Document {
                collection: F::COLLECTION,
                id,
            },
            None,
            F::foreign_keys().to_vec(),
            None,
        )
        .await
    }

    /// One-shot query. Joins use whatever state is loaded and never wait.
    pub async fn fetch<F: EntityFields>(&self, query: &CollectionQuery) -> AppResult<Vec<Entity<F>>> {
        if query.collection() != F::COLLECTION {
            return Err(AppError::Validation(format!(
                "query targets '{}' but '{}' was requested",
                query.collection(),
                F::COLLECTION
            )));
        }

        let documents = self.store.query(query).await?;
        match project::<F>(&documents, None, F::foreign_keys(), &self.state, false) {
            Projection::Ready(items, _) => Ok(items),
            Projection::Deferred(target) => Err(AppError::Internal(format!(
                "one-shot read deferred on '{target}'"
            ))),
        }
    }

    /// One-shot read of one entity.
    pub async fn fetch_one<F: EntityFields>(&self, id: &DocumentId) -> AppResult<Option<Entity<F>>> {
        let Some(document) = self.store.get(F::COLLECTION, id).await? else {
            return Ok(None);
        };

        match project::<F>(
            std::slice::from_ref(&document),
            None,
            F::foreign_keys(),
            &self.state,
            false,
        ) {
            Projection::Ready(items, _) => Ok(items.into_iter().next()),
            Projection::Deferred(target) => Err(AppError::Internal(format!(
                "one-shot read deferred on '{target}'"
            ))),
        }
    }

    async fn open_channel<F: EntityFields>(
        &self,
        target: ListenTarget,
        predicate: Option<EntityPredicate<F>>,
        joins: Vec<ForeignKey>,
        slice: Option<CollectionId>,
    ) -> AppResult<Subscription<F>> {
        let id = SubscriptionId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Some(collection) = slice {
            self.state.claim(collection, id)?;
        }

        let feed = match self.store.listen(target).await {
            Ok(feed) => feed,
            Err(error) => {
                if let Some(collection) = slice {
                    self.state.release(collection, id);
                }
                return Err(AppError::Subscription(format!(
                    "failed to attach {} channel: {error}",
                    F::COLLECTION
                )));
            }
        };

        let (snapshot_sender, snapshot_receiver) = watch::channel(None);
        let (status_sender, status_receiver) = watch::channel(ChannelStatus::Connecting);
        let publisher = Arc::new(Publisher::new(
            id,
            self.state.clone(),
            slice,
            snapshot_sender,
            status_sender,
        ));
        let token = CancellationToken::new();

        let task = tokio::spawn(channel::run(ChannelTask {
            id,
            feed,
            predicate,
            joins,
            state: self.state.clone(),
            publisher: publisher.clone(),
            token: token.clone(),
        }));

        info!(
            subscription = %id,
            collection = %F::COLLECTION,
            publishes_state = slice.is_some(),
            "channel opened"
        );

        Ok(Subscription::new(
            SnapshotWatcher::new(id, snapshot_receiver, status_receiver),
            ChannelHandle::new(id, token, publisher, task),
        ))
    }
}
