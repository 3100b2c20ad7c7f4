use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use futures_util::{StreamExt, stream};
use serde_json::Value;
use staffhub_core::{Actor, AppError, AppResult, UserId};
use staffhub_domain::{
    CollectionId, CollectionQuery, DocumentId, ExpenseClaimFields, ExpenseLine, PartnerDetails,
    ProductRequestFields, PromotionFields, StoredDocument, VendorFields,
};
use tokio::sync::{Barrier, Mutex, broadcast};
use tokio_stream::wrappers::BroadcastStream;

use crate::store_ports::{DocumentStore, ListenTarget, SnapshotFeed, StoreSnapshot, WriteBatch};

type Documents = BTreeMap<(CollectionId, String), Value>;

/// In-process store used by service tests.
pub(crate) struct FakeDocumentStore {
    documents: Arc<Mutex<Documents>>,
    changes: broadcast::Sender<()>,
    clock: std::sync::Mutex<DateTime<Utc>>,
    next_id: AtomicU64,
    fail_listen: AtomicBool,
    commits: AtomicU64,
    read_gate: std::sync::Mutex<Option<Arc<Barrier>>>,
}

impl Default for FakeDocumentStore {
    fn default() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            documents: Arc::new(Mutex::new(BTreeMap::new())),
            changes,
            clock: std::sync::Mutex::new(
                Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
                    .single()
                    .unwrap_or_else(|| unreachable!()),
            ),
            next_id: AtomicU64::new(1),
            fail_listen: AtomicBool::new(false),
            commits: AtomicU64::new(0),
            read_gate: std::sync::Mutex::new(None),
        }
    }
}

impl FakeDocumentStore {
    pub(crate) fn fail_listen(&self) {
        self.fail_listen.store(true, Ordering::SeqCst);
    }

    /// Makes every `get` wait until `readers` reads are in flight.
    pub(crate) fn hold_reads(&self, readers: usize) {
        let mut gate = self.read_gate.lock().unwrap_or_else(PoisonError::into_inner);
        *gate = Some(Arc::new(Barrier::new(readers)));
    }

    pub(crate) fn release_reads(&self) {
        let mut gate = self.read_gate.lock().unwrap_or_else(PoisonError::into_inner);
        *gate = None;
    }

    pub(crate) fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    pub(crate) async fn document(&self, collection: CollectionId, id: &str) -> Option<Value> {
        self.documents
            .lock()
            .await
            .get(&(collection, id.to_owned()))
            .cloned()
    }

    pub(crate) async fn insert_raw(&self, collection: CollectionId, id: &str, data: Value) {
        self.documents
            .lock()
            .await
            .insert((collection, id.to_owned()), data);
        let _ = self.changes.send(());
    }
}

async fn snapshot_of(documents: &Mutex<Documents>, target: &ListenTarget) -> StoreSnapshot {
    let documents = documents.lock().await;
    let matching = documents
        .iter()
        .filter(|((collection, _), _)| *collection == target.collection())
        .filter_map(|((_, id), data)| {
            let id = DocumentId::new(id.as_str()).ok()?;
            StoredDocument::new(id, data.clone()).ok()
        });

    let documents = match target {
        ListenTarget::Query(query) => query.apply(matching),
        ListenTarget::Document { id, .. } => matching.filter(|document| document.id() == id).collect(),
    };
    StoreSnapshot { documents }
}

#[async_trait]
impl DocumentStore for FakeDocumentStore {
    async fn server_time(&self) -> AppResult<DateTime<Utc>> {
        let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        *clock += Duration::seconds(1);
        Ok(*clock)
    }

    fn allocate_id(&self, collection: CollectionId) -> AppResult<DocumentId> {
        let next = self.next_id.fetch_add(1, Ordering::SeqCst);
        DocumentId::new(format!("{collection}-{next}"))
    }

    async fn get(
        &self,
        collection: CollectionId,
        id: &DocumentId,
    ) -> AppResult<Option<StoredDocument>> {
        let gate = self
            .read_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let document = self.document(collection, id.as_str()).await;
        if let Some(gate) = gate {
            gate.wait().await;
        }

        document
            .map(|data| StoredDocument::new(id.clone(), data))
            .transpose()
    }

    async fn query(&self, query: &CollectionQuery) -> AppResult<Vec<StoredDocument>> {
        Ok(snapshot_of(&self.documents, &ListenTarget::Query(query.clone()))
            .await
            .documents)
    }

    async fn commit(&self, batch: WriteBatch) -> AppResult<()> {
        let mut documents = self.documents.lock().await;
        let mut staged: BTreeMap<(CollectionId, String), Option<Value>> = BTreeMap::new();
        for op in batch.ops() {
            let (collection, id) = op.target();
            let key = (collection, id.as_str().to_owned());
            let current = match staged.get(&key) {
                Some(staged) => staged.clone(),
                None => documents.get(&key).cloned(),
            };
            let next = op.apply_to(current)?;
            if op.writes() {
                staged.insert(key, next);
            }
        }

        for (key, value) in staged {
            match value {
                Some(value) => documents.insert(key, value),
                None => documents.remove(&key),
            };
        }
        drop(documents);

        self.commits.fetch_add(1, Ordering::SeqCst);
        let _ = self.changes.send(());
        Ok(())
    }

    async fn listen(&self, target: ListenTarget) -> AppResult<SnapshotFeed> {
        if self.fail_listen.load(Ordering::SeqCst) {
            return Err(AppError::Persistence("listener unavailable".to_owned()));
        }

        let receiver = self.changes.subscribe();
        let initial = snapshot_of(&self.documents, &target).await;
        let documents = self.documents.clone();
        let updates = BroadcastStream::new(receiver).then(move |_| {
            let documents = documents.clone();
            let target = target.clone();
            async move { Ok(snapshot_of(&documents, &target).await) }
        });

        Ok(stream::once(async move { Ok(initial) }).chain(updates).boxed())
    }
}

pub(crate) fn user(value: &str) -> UserId {
    UserId::new(value).unwrap_or_else(|_| unreachable!())
}

pub(crate) fn actor(value: &str) -> Actor {
    Actor::new(user(value), format!("User {value}"), None)
}

pub(crate) fn vendor(name: &str) -> VendorFields {
    VendorFields(PartnerDetails {
        name: name.to_owned(),
        source: "manual".to_owned(),
        source_id: None,
    })
}

pub(crate) fn product_request(vendor: &DocumentId, owner: &str) -> ProductRequestFields {
    ProductRequestFields {
        vendor: vendor.clone(),
        vendor_sku: "SKU-1".to_owned(),
        description: "Standing desk".to_owned(),
        cost_cents: 45_000,
        user: user(owner),
    }
}

pub(crate) fn promotion(title: &str, owner: &str) -> PromotionFields {
    PromotionFields {
        title: title.to_owned(),
        body: "Details inside".to_owned(),
        expiry: None,
        user: user(owner),
    }
}

pub(crate) fn expense_claim(owner: &str) -> ExpenseClaimFields {
    ExpenseClaimFields {
        expenses: vec![ExpenseLine {
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap_or_else(|| unreachable!()),
            description: "Client lunch".to_owned(),
            amount_cents: 8_450,
        }],
        manager: user("manager"),
        user: user(owner),
    }
}
