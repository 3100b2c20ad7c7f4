use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde_json::Value;
use staffhub_core::{Actor, AppError, AppResult, UserId};
use staffhub_domain::{
    ActionType, CollectionId, DocumentId, Entity, EntityFields, NotificationKind,
    NotificationRecord, compute_recipients,
};
use tracing::{info, warn};

use crate::delivery_ports::NotificationTransport;

/// Notification about one committed mutation, before recipient fan-out.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    kind: NotificationKind,
    collection: CollectionId,
    entity_id: DocumentId,
    sender: UserId,
    sender_name: String,
    title: String,
    body: Option<String>,
    status: Option<ActionType>,
    subscribers: Vec<UserId>,
    notify_users: Vec<UserId>,
    data: Value,
    occurred_at: DateTime<Utc>,
}

impl Notification {
    /// Describes `kind` happening to a persisted entity, addressed to its subscribers.
    ///
    /// Records are stamped with the entity's last update time, which is store time.
    pub fn about<F: EntityFields>(
        kind: NotificationKind,
        entity: &Entity<F>,
        actor: &Actor,
    ) -> AppResult<Self> {
        let entity_id = entity.require_id()?.clone();
        let occurred_at = entity
            .metadata()
            .map(|metadata| metadata.updated_at())
            .ok_or_else(|| {
                AppError::Internal(format!("{} '{entity_id}' has no metadata", F::COLLECTION))
            })?;
        let subject = entity.fields().title();
        Ok(Self {
            kind,
            collection: F::COLLECTION,
            entity_id,
            sender: actor.user_id().clone(),
            sender_name: actor.display_name().to_owned(),
            title: format!(
                "{} {} {} '{subject}'",
                actor.display_name(),
                kind.verb(),
                F::COLLECTION.label().to_lowercase()
            ),
            body: None,
            status: None,
            subscribers: entity.fields().subscribers(),
            notify_users: Vec::new(),
            data: serde_json::to_value(entity.fields()).unwrap_or(Value::Null),
            occurred_at,
        })
    }

    /// Overrides the event time, e.g. with the store time of a deletion.
    #[must_use]
    pub fn with_occurred_at(mut self, at: DateTime<Utc>) -> Self {
        self.occurred_at = at;
        self
    }

    /// Adds a longer text, such as a comment body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Adds recipients beyond the entity's subscribers.
    #[must_use]
    pub fn with_notify_users(mut self, users: impl IntoIterator<Item = UserId>) -> Self {
        self.notify_users.extend(users);
        self
    }

    /// Records the new workflow status.
    #[must_use]
    pub fn with_status(mut self, status: ActionType) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns the recipients: subscribers and explicit users, minus the sender.
    #[must_use]
    pub fn recipients(&self) -> Vec<UserId> {
        compute_recipients(&self.subscribers, &self.notify_users, &self.sender)
    }

    /// Returns the summary line.
    #[must_use]
    pub fn title(&self) -> &str {
        self.title.as_str()
    }

    fn record_for(&self, recipient: UserId) -> NotificationRecord {
        NotificationRecord {
            kind: self.kind,
            collection: self.collection,
            entity_id: self.entity_id.clone(),
            recipient,
            sender: self.sender.clone(),
            sender_name: self.sender_name.clone(),
            title: self.title.clone(),
            body: self.body.clone(),
            status: self.status,
            data: self.data.clone(),
            created_at: self.occurred_at,
        }
    }
}

/// Delivery counts of one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Number of distinct recipients.
    pub recipients: usize,
    /// Successful transport deliveries.
    pub delivered: usize,
    /// Failed transport deliveries.
    pub failed: usize,
}

/// Fans notifications out to every recipient through every transport.
#[derive(Clone)]
pub struct NotificationService {
    transports: Vec<Arc<dyn NotificationTransport>>,
}

impl NotificationService {
    /// Creates a dispatcher over the given transports.
    #[must_use]
    pub fn new(transports: Vec<Arc<dyn NotificationTransport>>) -> Self {
        Self { transports }
    }

    /// Delivers the notification. Failures are logged and counted, never returned.
    pub async fn dispatch(&self, notification: &Notification) -> DispatchReport {
        let recipients = notification.recipients();
        let records = recipients
            .iter()
            .cloned()
            .map(|recipient| notification.record_for(recipient))
            .collect::<Vec<_>>();

        let deliveries = records.iter().flat_map(|record| {
            self.transports.iter().map(move |transport| async move {
                let result = transport.deliver(record).await;
                if let Err(error) = &result {
                    warn!(
                        transport = transport.name(),
                        recipient = %record.recipient,
                        collection = %record.collection,
                        entity_id = %record.entity_id,
                        error = %error,
                        "notification delivery failed"
                    );
                }
                result.is_ok()
            })
        });
        let outcomes = join_all(deliveries).await;

        let delivered = outcomes.iter().filter(|delivered| **delivered).count();
        let report = DispatchReport {
            recipients: recipients.len(),
            delivered,
            failed: outcomes.len() - delivered,
        };
        info!(
            kind = %notification.kind,
            collection = %notification.collection,
            entity_id = %notification.entity_id,
            recipients = report.recipients,
            delivered = report.delivered,
            failed = report.failed,
            "notification dispatched"
        );
        report
    }

    /// Dispatches on the runtime without waiting for delivery.
    pub fn dispatch_detached(&self, notification: Notification) {
        let service = self.clone();
        tokio::spawn(async move {
            service.dispatch(&notification).await;
        });
    }
}

#[cfg(test)]
mod tests;
