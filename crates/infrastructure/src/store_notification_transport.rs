use std::sync::Arc;

use async_trait::async_trait;
use staffhub_application::{DocumentStore, NotificationTransport, WriteBatch};
use staffhub_core::{AppError, AppResult};
use staffhub_domain::{CollectionId, NotificationRecord};

/// Writes each record into the `notifications` collection, where downstream
/// consumers (push delivery, in-app inbox) pick it up.
#[derive(Clone)]
pub struct StoreNotificationTransport {
    store: Arc<dyn DocumentStore>,
}

impl StoreNotificationTransport {
    /// Creates a transport writing through `store`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl NotificationTransport for StoreNotificationTransport {
    fn name(&self) -> &'static str {
        "store"
    }

    async fn deliver(&self, record: &NotificationRecord) -> AppResult<()> {
        let data = serde_json::to_value(record).map_err(|error| {
            AppError::Notification(format!("failed to serialize notification: {error}"))
        })?;
        let id = self.store.allocate_id(CollectionId::Notifications)?;

        let mut batch = WriteBatch::new();
        batch.create(CollectionId::Notifications, id, data);
        self.store
            .commit(batch)
            .await
            .map_err(|error| AppError::Notification(format!("failed to store notification: {error}")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use serde_json::Value;
    use staffhub_application::NotificationTransport;
    use staffhub_core::UserId;
    use staffhub_domain::{CollectionId, DocumentId, NotificationKind, NotificationRecord};

    use super::StoreNotificationTransport;
    use crate::InMemoryDocumentStore;

    #[tokio::test]
    async fn records_land_in_notifications_collection() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let transport = StoreNotificationTransport::new(store.clone());
        let record = NotificationRecord {
            kind: NotificationKind::Created,
            collection: CollectionId::LeaveRequests,
            entity_id: DocumentId::new("leave-1").unwrap_or_else(|_| unreachable!()),
            recipient: UserId::new("manager").unwrap_or_else(|_| unreachable!()),
            sender: UserId::new("staff").unwrap_or_else(|_| unreachable!()),
            sender_name: "Staff".to_owned(),
            title: "Staff created leave request".to_owned(),
            body: None,
            status: None,
            data: Value::Null,
            created_at: Utc::now(),
        };

        assert!(transport.deliver(&record).await.is_ok());
        assert_eq!(store.document_count(CollectionId::Notifications).await, 1);
    }
}
