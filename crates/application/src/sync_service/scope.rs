use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use staffhub_core::AppResult;
use staffhub_domain::{DocumentId, EntityFields};

use super::{ChannelHandle, SnapshotWatcher, SubscribeOptions, SubscriptionId, SyncService};

/// Per-view arena of channels. Dropping the scope disposes every channel in it.
pub struct SubscriptionScope {
    sync: SyncService,
    handles: Mutex<HashMap<SubscriptionId, ChannelHandle>>,
}

impl SubscriptionScope {
    /// Creates an empty scope.
    #[must_use]
    pub fn new(sync: SyncService) -> Self {
        Self {
            sync,
            handles: Mutex::new(HashMap::new()),
        }
    }

    fn handles(&self) -> MutexGuard<'_, HashMap<SubscriptionId, ChannelHandle>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens a collection channel owned by this scope.
    pub async fn subscribe<F: EntityFields>(
        &self,
        options: SubscribeOptions<F>,
    ) -> AppResult<SnapshotWatcher<F>> {
        let (watcher, handle) = self.sync.subscribe(options).await?.into_parts();
        self.handles().insert(handle.id(), handle);
        Ok(watcher)
    }

    /// Opens a single-document channel owned by this scope.
    pub async fn subscribe_document<F: EntityFields>(
        &self,
        id: DocumentId,
    ) -> AppResult<SnapshotWatcher<F>> {
        let (watcher, handle) = self.sync.subscribe_document(id).await?.into_parts();
        self.handles().insert(handle.id(), handle);
        Ok(watcher)
    }

    /// Disposes one channel. Returns whether it belonged to this scope.
    pub fn dispose(&self, id: SubscriptionId) -> bool {
        let handle = self.handles().remove(&id);
        match handle {
            Some(handle) => {
                handle.dispose();
                true
            }
            None => false,
        }
    }

    /// Disposes every channel and returns how many were open.
    pub fn dispose_all(&self) -> usize {
        let handles = std::mem::take(&mut *self.handles());
        let count = handles.len();
        for handle in handles.into_values() {
            handle.dispose();
        }
        count
    }

    /// Returns the number of open channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles().len()
    }

    /// Returns whether no channel is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles().is_empty()
    }
}

impl Drop for SubscriptionScope {
    fn drop(&mut self) {
        self.dispose_all();
    }
}
