use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use staffhub_application::{DocumentStore, EmailService, NotificationTransport};
use staffhub_core::{AppError, AppResult};
use staffhub_domain::{CollectionId, DocumentId, NotificationRecord};

/// Emails each record to the recipient's directory address.
#[derive(Clone)]
pub struct EmailNotificationTransport {
    store: Arc<dyn DocumentStore>,
    email: Arc<dyn EmailService>,
}

impl EmailNotificationTransport {
    /// Creates a transport that resolves addresses from the staff directory.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, email: Arc<dyn EmailService>) -> Self {
        Self { store, email }
    }

    async fn recipient_address(&self, record: &NotificationRecord) -> AppResult<String> {
        let id = DocumentId::new(record.recipient.as_str())?;
        let profile = self.store.get(CollectionId::Users, &id).await?;
        profile
            .as_ref()
            .and_then(|profile| profile.data().get("email"))
            .and_then(Value::as_str)
            .filter(|address| !address.trim().is_empty())
            .map(str::to_owned)
            .ok_or_else(|| {
                AppError::Notification(format!(
                    "no email address on file for user '{}'",
                    record.recipient
                ))
            })
    }
}

fn text_body(record: &NotificationRecord) -> String {
    match record.body.as_deref() {
        Some(body) => format!("{}\n\n{body}", record.title),
        None => record.title.clone(),
    }
}

#[async_trait]
impl NotificationTransport for EmailNotificationTransport {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn deliver(&self, record: &NotificationRecord) -> AppResult<()> {
        let address = self.recipient_address(record).await?;
        self.email
            .send_email(&address, &record.title, &text_body(record), None)
            .await
    }
}
