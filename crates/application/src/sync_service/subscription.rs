use std::fmt::{Display, Formatter};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use staffhub_domain::{Entity, EntityFields};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;

/// Identifier of one open channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Wraps a raw id.
    #[must_use]
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw id.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for SubscriptionId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Health of a channel as seen by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    /// Waiting for the first snapshot.
    Connecting,
    /// At least one snapshot was emitted and the feed is healthy.
    Live,
    /// The feed reported an error or closed; the last snapshot is stale.
    Degraded,
}

/// Full ordered result set emitted by a channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot<F> {
    /// Emission counter, starting at 1 per channel.
    pub sequence: u64,
    /// Entities in presentation order.
    pub items: Vec<Entity<F>>,
}

pub(super) trait ChannelCloser: Send + Sync {
    fn close(&self);
}

/// Owns a running channel; disposing (or dropping) it stops all emissions.
pub struct ChannelHandle {
    id: SubscriptionId,
    token: CancellationToken,
    closer: Arc<dyn ChannelCloser>,
    task: JoinHandle<()>,
}

impl ChannelHandle {
    pub(super) fn new(
        id: SubscriptionId,
        token: CancellationToken,
        closer: Arc<dyn ChannelCloser>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            id,
            token,
            closer,
            task,
        }
    }

    /// Returns channel id.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Stops the channel. Once this returns, no snapshot or state write happens.
    pub fn dispose(&self) {
        self.token.cancel();
        self.closer.close();
        self.task.abort();
    }

    /// Returns whether the channel was disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Read side of a channel. Cloning is cheap; watchers never keep a channel alive.
pub struct SnapshotWatcher<F> {
    id: SubscriptionId,
    snapshots: watch::Receiver<Option<Snapshot<F>>>,
    status: watch::Receiver<ChannelStatus>,
}

impl<F> Clone for SnapshotWatcher<F> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            snapshots: self.snapshots.clone(),
            status: self.status.clone(),
        }
    }
}

impl<F: EntityFields> SnapshotWatcher<F> {
    pub(super) fn new(
        id: SubscriptionId,
        snapshots: watch::Receiver<Option<Snapshot<F>>>,
        status: watch::Receiver<ChannelStatus>,
    ) -> Self {
        Self {
            id,
            snapshots,
            status,
        }
    }

    /// Returns channel id.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns the most recent snapshot, if any was emitted.
    #[must_use]
    pub fn latest(&self) -> Option<Snapshot<F>> {
        self.snapshots.borrow().clone()
    }

    /// Returns current channel status.
    #[must_use]
    pub fn status(&self) -> ChannelStatus {
        *self.status.borrow()
    }

    /// Waits for the next snapshot newer than the last one seen by this watcher.
    /// Returns `None` once the channel is disposed.
    pub async fn next_snapshot(&mut self) -> Option<Snapshot<F>> {
        loop {
            if self.snapshots.changed().await.is_err() {
                return None;
            }
            if let Some(snapshot) = self.snapshots.borrow_and_update().clone() {
                return Some(snapshot);
            }
        }
    }

    /// Stream starting with the current snapshot, then every later one.
    /// Each call restarts from the current snapshot.
    #[must_use]
    pub fn stream(&self) -> BoxStream<'static, Snapshot<F>> {
        WatchStream::new(self.snapshots.clone())
            .filter_map(|snapshot| async move { snapshot })
            .boxed()
    }

    /// Stream of status changes, starting with the current status.
    #[must_use]
    pub fn status_stream(&self) -> BoxStream<'static, ChannelStatus> {
        WatchStream::new(self.status.clone()).boxed()
    }
}

/// A watcher bundled with the handle that keeps its channel alive.
pub struct Subscription<F> {
    watcher: SnapshotWatcher<F>,
    handle: ChannelHandle,
}

impl<F: EntityFields> Subscription<F> {
    pub(super) fn new(watcher: SnapshotWatcher<F>, handle: ChannelHandle) -> Self {
        Self { watcher, handle }
    }

    /// Returns channel id.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.handle.id()
    }

    /// Returns the read side.
    #[must_use]
    pub fn watcher(&self) -> &SnapshotWatcher<F> {
        &self.watcher
    }

    /// Returns the most recent snapshot.
    #[must_use]
    pub fn latest(&self) -> Option<Snapshot<F>> {
        self.watcher.latest()
    }

    /// Returns current channel status.
    #[must_use]
    pub fn status(&self) -> ChannelStatus {
        self.watcher.status()
    }

    /// Waits for the next unseen snapshot.
    pub async fn next_snapshot(&mut self) -> Option<Snapshot<F>> {
        self.watcher.next_snapshot().await
    }

    /// Restartable snapshot stream; see [`SnapshotWatcher::stream`].
    #[must_use]
    pub fn stream(&self) -> BoxStream<'static, Snapshot<F>> {
        self.watcher.stream()
    }

    /// Stops the channel.
    pub fn dispose(&self) {
        self.handle.dispose();
    }

    /// Splits into read side and handle.
    #[must_use]
    pub fn into_parts(self) -> (SnapshotWatcher<F>, ChannelHandle) {
        (self.watcher, self.handle)
    }

    /// Converts into a stream that disposes the channel when dropped.
    #[must_use]
    pub fn into_stream(self) -> SnapshotStream<F> {
        SnapshotStream {
            inner: self.watcher.stream(),
            _handle: self.handle,
        }
    }
}

/// Snapshot stream owning its channel.
pub struct SnapshotStream<F> {
    inner: BoxStream<'static, Snapshot<F>>,
    _handle: ChannelHandle,
}

impl<F> Stream for SnapshotStream<F> {
    type Item = Snapshot<F>;

    fn poll_next(mut self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(context)
    }
}
