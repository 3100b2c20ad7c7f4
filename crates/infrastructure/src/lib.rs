//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod change_feed;
mod console_email_service;
mod email_notification_transport;
mod in_memory_document_store;
mod local_blob_storage;
mod postgres_document_store;
mod smtp_email_service;
mod store_notification_transport;
mod webhook_notification_transport;

pub use console_email_service::ConsoleEmailService;
pub use email_notification_transport::EmailNotificationTransport;
pub use in_memory_document_store::InMemoryDocumentStore;
pub use local_blob_storage::LocalBlobStorage;
pub use postgres_document_store::PostgresDocumentStore;
pub use smtp_email_service::{SmtpEmailConfig, SmtpEmailService};
pub use store_notification_transport::StoreNotificationTransport;
pub use webhook_notification_transport::WebhookNotificationTransport;
