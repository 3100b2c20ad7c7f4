//! Application services and ports.

#![forbid(unsafe_code)]

mod attachment_service;
mod delivery_ports;
mod mutation_pipeline;
mod notification_service;
mod pagination_service;
mod store_ports;
mod sync_service;

#[cfg(test)]
mod test_support;

pub use attachment_service::{AttachmentService, Upload};
pub use delivery_ports::{BlobStorage, EmailService, NotificationTransport, StoredBlob};
pub use mutation_pipeline::{MutationOutcome, MutationPipeline, UpdateInput};
pub use notification_service::{DispatchReport, Notification, NotificationService};
pub use pagination_service::PaginationService;
pub use store_ports::{
    DocumentStore, ListenTarget, SnapshotFeed, StoreSnapshot, WriteBatch, WriteOp,
};
pub use sync_service::{
    ApplicationState, ChannelHandle, ChannelStatus, EntityPredicate, Snapshot, SnapshotStream,
    SnapshotWatcher, SubscribeOptions, Subscription, SubscriptionId, SubscriptionScope,
    SyncService, SliceRecords,
};
