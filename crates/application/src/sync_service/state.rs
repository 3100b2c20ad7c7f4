use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use staffhub_core::{AppError, AppResult};
use staffhub_domain::CollectionId;
use tokio::sync::watch;

use super::SubscriptionId;

/// Records of one published collection keyed by document id. Each record
/// carries its id under `id`.
pub type SliceRecords = Arc<HashMap<String, Value>>;

struct Slice {
    owner: SubscriptionId,
    records: Option<SliceRecords>,
}

struct StateInner {
    slices: Mutex<HashMap<CollectionId, Slice>>,
    version: watch::Sender<u64>,
}

/// Shared hydrated state, one slice per collection.
///
/// A slice has a single writer: the channel that claimed it. Releasing the
/// claim clears the slice.
#[derive(Clone)]
pub struct ApplicationState {
    inner: Arc<StateInner>,
}

impl Default for ApplicationState {
    fn default() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: Arc::new(StateInner {
                slices: Mutex::new(HashMap::new()),
                version,
            }),
        }
    }
}

impl ApplicationState {
    /// Creates empty application state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slices(&self) -> MutexGuard<'_, HashMap<CollectionId, Slice>> {
        self.inner
            .slices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.inner.version.send_modify(|version| *version += 1);
    }

    /// Claims the slice for `owner`. Fails while another channel holds it.
    pub fn claim(&self, collection: CollectionId, owner: SubscriptionId) -> AppResult<()> {
        let mut slices = self.slices();
        if let Some(slice) = slices.get(&collection)
            && slice.owner != owner
        {
            return Err(AppError::Conflict(format!(
                "state slice '{collection}' is already published by subscription {}",
                slice.owner
            )));
        }

        slices.insert(
            collection,
            Slice {
                owner,
                records: None,
            },
        );
        Ok(())
    }

    /// Replaces the slice contents. Writes from non-owners are ignored.
    pub fn publish(
        &self,
        collection: CollectionId,
        owner: SubscriptionId,
        records: HashMap<String, Value>,
    ) -> bool {
        {
            let mut slices = self.slices();
            match slices.get_mut(&collection) {
                Some(slice) if slice.owner == owner => {
                    slice.records = Some(Arc::new(records));
                }
                _ => return false,
            }
        }

        self.bump();
        true
    }

    /// Releases and clears the slice if `owner` holds it.
    pub fn release(&self, collection: CollectionId, owner: SubscriptionId) -> bool {
        let released = {
            let mut slices = self.slices();
            match slices.get(&collection) {
                Some(slice) if slice.owner == owner => slices.remove(&collection).is_some(),
                _ => false,
            }
        };

        if released {
            self.bump();
        }
        released
    }

    /// Returns the loaded records of a slice; `None` while unclaimed or not yet hydrated.
    #[must_use]
    pub fn slice(&self, collection: CollectionId) -> Option<SliceRecords> {
        self.slices()
            .get(&collection)
            .and_then(|slice| slice.records.clone())
    }

    /// Returns the subscription currently holding a slice.
    #[must_use]
    pub fn owner(&self, collection: CollectionId) -> Option<SubscriptionId> {
        self.slices().get(&collection).map(|slice| slice.owner)
    }

    /// Returns a receiver that changes whenever any slice changes.
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.version.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;
    use staffhub_domain::CollectionId;

    use super::ApplicationState;
    use crate::sync_service::SubscriptionId;

    #[test]
    fn slice_has_a_single_writer() {
        let state = ApplicationState::new();
        let first = SubscriptionId::from_raw(1);
        let second = SubscriptionId::from_raw(2);

        assert!(state.claim(CollectionId::Vendors, first).is_ok());
        assert!(state.claim(CollectionId::Vendors, second).is_err());
        assert!(!state.publish(CollectionId::Vendors, second, HashMap::new()));

        let records = HashMap::from([("v-1".to_owned(), json!({"id": "v-1"}))]);
        assert!(state.publish(CollectionId::Vendors, first, records));
        assert_eq!(state.slice(CollectionId::Vendors).map(|slice| slice.len()), Some(1));
    }

    #[test]
    fn release_clears_the_slice() {
        let state = ApplicationState::new();
        let owner = SubscriptionId::from_raw(1);
        let changes = state.changes();

        assert!(state.claim(CollectionId::Locations, owner).is_ok());
        assert!(state.publish(CollectionId::Locations, owner, HashMap::new()));
        assert!(state.release(CollectionId::Locations, owner));
        assert!(state.slice(CollectionId::Locations).is_none());
        assert!(state.owner(CollectionId::Locations).is_none());
        assert!(changes.has_changed().unwrap_or(false));
    }
}
