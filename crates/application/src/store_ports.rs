mod document_store;
mod write_batch;

pub use document_store::{DocumentStore, ListenTarget, SnapshotFeed, StoreSnapshot};
pub use write_batch::{WriteBatch, WriteOp};
