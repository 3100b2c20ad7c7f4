use std::future::{Future, ready};
use std::sync::Arc;

use futures_util::{StreamExt, stream};
use staffhub_application::{ListenTarget, SnapshotFeed, StoreSnapshot};
use staffhub_core::AppResult;
use staffhub_domain::{CollectionId, StoredDocument};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

const NOTICE_CAPACITY: usize = 256;

/// Fan-out of "collection changed" notices to open feeds.
#[derive(Clone)]
pub(crate) struct ChangeNotifier {
    sender: broadcast::Sender<CollectionId>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(NOTICE_CAPACITY);
        Self { sender }
    }
}

impl ChangeNotifier {
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<CollectionId> {
        self.sender.subscribe()
    }

    /// Announces a committed change. Having no open feed is fine.
    pub(crate) fn notify(&self, collection: CollectionId) {
        let _ = self.sender.send(collection);
    }

    /// Announces every collection, forcing all feeds to re-read.
    pub(crate) fn notify_all(&self) {
        for collection in CollectionId::all() {
            self.notify(*collection);
        }
    }
}

/// Builds a feed that yields `initial`, then a fresh snapshot after every
/// notice for the target's collection. A lagged receiver re-reads as well.
pub(crate) fn snapshot_feed<Q, Fut>(
    target: ListenTarget,
    receiver: broadcast::Receiver<CollectionId>,
    initial: StoreSnapshot,
    requery: Q,
) -> SnapshotFeed
where
    Q: Fn(ListenTarget) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<StoreSnapshot>> + Send + 'static,
{
    let collection = target.collection();
    let requery = Arc::new(requery);
    let updates = BroadcastStream::new(receiver)
        .filter_map(move |notice| {
            let relevant = match notice {
                Ok(changed) => changed == collection,
                Err(BroadcastStreamRecvError::Lagged(_)) => true,
            };
            ready(relevant.then_some(()))
        })
        .then(move |()| (*requery)(target.clone()));

    stream::once(ready(Ok(initial))).chain(updates).boxed()
}

/// Narrows a query result to the listened document when the target is a single id.
pub(crate) fn select_target(
    target: &ListenTarget,
    documents: Vec<StoredDocument>,
) -> Vec<StoredDocument> {
    match target {
        ListenTarget::Query(query) => query.apply(documents),
        ListenTarget::Document { id, .. } => documents
            .into_iter()
            .filter(|document| document.id() == id)
            .collect(),
    }
}
