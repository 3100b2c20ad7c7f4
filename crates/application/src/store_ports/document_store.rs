use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;
use staffhub_core::AppResult;
use staffhub_domain::{CollectionId, CollectionQuery, DocumentId, StoredDocument};

use super::WriteBatch;

/// What a change feed observes.
#[derive(Debug, Clone, PartialEq)]
pub enum ListenTarget {
    /// Every document matching a query.
    Query(CollectionQuery),
    /// One document.
    Document {
        /// Collection of the document.
        collection: CollectionId,
        /// Document id.
        id: DocumentId,
    },
}

impl ListenTarget {
    /// Returns the observed collection.
    #[must_use]
    pub fn collection(&self) -> CollectionId {
        match self {
            Self::Query(query) => query.collection(),
            Self::Document { collection, .. } => *collection,
        }
    }
}

/// Full result set of a listen target at one point in time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoreSnapshot {
    /// Matching documents in query order.
    pub documents: Vec<StoredDocument>,
}

/// Change feed yielding a full snapshot initially and after every relevant commit.
pub type SnapshotFeed = BoxStream<'static, AppResult<StoreSnapshot>>;

/// Port for the realtime document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the store's clock. Metadata stamps use this, never the caller's clock.
    async fn server_time(&self) -> AppResult<DateTime<Utc>>;

    /// Allocates a fresh document id without writing anything.
    fn allocate_id(&self, collection: CollectionId) -> AppResult<DocumentId>;

    /// Reads one document.
    async fn get(
        &self,
        collection: CollectionId,
        id: &DocumentId,
    ) -> AppResult<Option<StoredDocument>>;

    /// Runs a one-shot query.
    async fn query(&self, query: &CollectionQuery) -> AppResult<Vec<StoredDocument>>;

    /// Applies every operation of the batch atomically, or none of them.
    async fn commit(&self, batch: WriteBatch) -> AppResult<()>;

    /// Opens a change feed for the target.
    async fn listen(&self, target: ListenTarget) -> AppResult<SnapshotFeed>;
}
