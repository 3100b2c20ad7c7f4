use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use staffhub_application::{DocumentStore, ListenTarget, SnapshotFeed, StoreSnapshot, WriteBatch};
use staffhub_core::AppResult;
use staffhub_domain::{CollectionId, CollectionQuery, DocumentId, StoredDocument};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::change_feed::{ChangeNotifier, select_target, snapshot_feed};

type DocumentKey = (CollectionId, String);
type Documents = BTreeMap<DocumentKey, Value>;

/// Process-local document store with change feeds. Commits hold one write
/// lock, so a batch is applied entirely or not at all.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<RwLock<Documents>>,
    notifier: ChangeNotifier,
    last_time: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl InMemoryDocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of documents in a collection.
    pub async fn document_count(&self, collection: CollectionId) -> usize {
        self.documents
            .read()
            .await
            .keys()
            .filter(|(stored, _)| *stored == collection)
            .count()
    }
}

async fn read_collection(documents: &RwLock<Documents>, collection: CollectionId) -> Vec<StoredDocument> {
    documents
        .read()
        .await
        .iter()
        .filter(|((stored, _), _)| *stored == collection)
        .filter_map(|((_, id), data)| {
            let id = DocumentId::new(id.as_str()).ok()?;
            StoredDocument::new(id, data.clone()).ok()
        })
        .collect()
}

async fn snapshot(documents: &RwLock<Documents>, target: &ListenTarget) -> StoreSnapshot {
    let all = read_collection(documents, target.collection()).await;
    StoreSnapshot {
        documents: select_target(target, all),
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn server_time(&self) -> AppResult<DateTime<Utc>> {
        let mut last_time = self
            .last_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();
        let next = match *last_time {
            Some(previous) if previous >= now => previous + Duration::microseconds(1),
            _ => now,
        };
        *last_time = Some(next);
        Ok(next)
    }

    fn allocate_id(&self, _collection: CollectionId) -> AppResult<DocumentId> {
        DocumentId::new(Uuid::new_v4().simple().to_string())
    }

    async fn get(
        &self,
        collection: CollectionId,
        id: &DocumentId,
    ) -> AppResult<Option<StoredDocument>> {
        let data = self
            .documents
            .read()
            .await
            .get(&(collection, id.as_str().to_owned()))
            .cloned();

        data.map(|data| StoredDocument::new(id.clone(), data))
            .transpose()
    }

    async fn query(&self, query: &CollectionQuery) -> AppResult<Vec<StoredDocument>> {
        Ok(query.apply(read_collection(&self.documents, query.collection()).await))
    }

    async fn commit(&self, batch: WriteBatch) -> AppResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut documents = self.documents.write().await;
        let mut staged: BTreeMap<DocumentKey, Option<Value>> = BTreeMap::new();
        for op in batch.ops() {
            let (collection, id) = op.target();
            let key = (collection, id.as_str().to_owned());
            let current = match staged.get(&key) {
                Some(pending) => pending.clone(),
                None => documents.get(&key).cloned(),
            };
            let next = op.apply_to(current)?;
            if op.writes() {
                staged.insert(key, next);
            }
        }

        let touched = staged
            .keys()
            .map(|(collection, _)| *collection)
            .collect::<BTreeSet<_>>();
        for (key, value) in staged {
            match value {
                Some(value) => {
                    documents.insert(key, value);
                }
                None => {
                    documents.remove(&key);
                }
            }
        }
        drop(documents);

        debug!(
            operations = batch.ops().len(),
            collections = touched.len(),
            "batch committed"
        );
        for collection in touched {
            self.notifier.notify(collection);
        }

        Ok(())
    }

    async fn listen(&self, target: ListenTarget) -> AppResult<SnapshotFeed> {
        let receiver = self.notifier.subscribe();
        let initial = snapshot(&self.documents, &target).await;
        let documents = self.documents.clone();

        Ok(snapshot_feed(target, receiver, initial, move |target| {
            let documents = documents.clone();
            async move { Ok(snapshot(&documents, &target).await) }
        }))
    }
}

#[cfg(test)]
mod tests;
