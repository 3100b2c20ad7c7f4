use serde::{Deserialize, Serialize};
use serde_json::Value;
use staffhub_core::{AppError, AppResult, UserId};

use crate::{CollectionId, DocumentId};

/// Counter field holding the document count.
pub const COUNT_FIELD: &str = "count";
/// Counter field holding ids in insertion order.
pub const DOCUMENTS_FIELD: &str = "documents";

/// Which slice of a collection a counter tracks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "user")]
pub enum CounterScope {
    /// Every document of the collection.
    Collection,
    /// Documents owned by one user.
    Owner(UserId),
}

impl CounterScope {
    /// Returns the counter document id for a collection.
    pub fn document_id(&self, collection: CollectionId) -> AppResult<DocumentId> {
        match self {
            Self::Collection => DocumentId::new(collection.as_str()),
            Self::Owner(user) => DocumentId::new(format!("{}:{user}", collection.as_str())),
        }
    }
}

/// Denormalized count and id list of a collection slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Counter {
    collection: CollectionId,
    scope: CounterScope,
    count: u64,
    documents: Vec<DocumentId>,
}

#[derive(Deserialize)]
struct CounterRecord {
    #[serde(default)]
    count: i64,
    #[serde(default)]
    documents: Vec<DocumentId>,
}

impl Counter {
    /// Counter for a slice that has no documents yet.
    #[must_use]
    pub fn empty(collection: CollectionId, scope: CounterScope) -> Self {
        Self {
            collection,
            scope,
            count: 0,
            documents: Vec::new(),
        }
    }

    /// Parses a counter document body.
    pub fn from_storage(
        collection: CollectionId,
        scope: CounterScope,
        data: &Value,
    ) -> AppResult<Self> {
        let record = CounterRecord::deserialize(data).map_err(|error| {
            AppError::Persistence(format!("malformed counter for {collection}: {error}"))
        })?;

        let count = u64::try_from(record.count).map_err(|_| {
            AppError::Persistence(format!(
                "counter for {collection} holds a negative count {}",
                record.count
            ))
        })?;

        Ok(Self {
            collection,
            scope,
            count,
            documents: record.documents,
        })
    }

    /// Returns counted collection.
    #[must_use]
    pub fn collection(&self) -> CollectionId {
        self.collection
    }

    /// Returns counter scope.
    #[must_use]
    pub fn scope(&self) -> &CounterScope {
        &self.scope
    }

    /// Returns the stored count.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns ids in insertion order.
    #[must_use]
    pub fn documents(&self) -> &[DocumentId] {
        self.documents.as_slice()
    }

    /// Returns ids newest first, the presentation order of paged lists.
    #[must_use]
    pub fn newest_first(&self) -> Vec<DocumentId> {
        self.documents.iter().rev().cloned().collect()
    }
}
