use std::time::Duration;

use async_trait::async_trait;
use staffhub_application::NotificationTransport;
use staffhub_core::{AppError, AppResult};
use staffhub_domain::NotificationRecord;
use tracing::debug;

/// Posts each record as JSON to a webhook, retrying transient failures.
pub struct WebhookNotificationTransport {
    http_client: reqwest::Client,
    endpoint: String,
    max_attempts: u8,
    retry_backoff_ms: u64,
}

impl WebhookNotificationTransport {
    /// Creates a webhook transport.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        endpoint: impl Into<String>,
        max_attempts: u8,
        retry_backoff_ms: u64,
    ) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
            max_attempts: max_attempts.max(1),
            retry_backoff_ms: retry_backoff_ms.max(50),
        }
    }
}

#[async_trait]
impl NotificationTransport for WebhookNotificationTransport {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn deliver(&self, record: &NotificationRecord) -> AppResult<()> {
        let mut attempt = 0_u8;
        let mut last_error: Option<String> = None;

        while attempt < self.max_attempts {
            attempt = attempt.saturating_add(1);
            let response = self
                .http_client
                .post(self.endpoint.as_str())
                .header("X-Staffhub-Notification", record.kind.as_str())
                .json(record)
                .send()
                .await;

            match response {
                Ok(response) if response.status().is_success() => {
                    debug!(attempt, recipient = %record.recipient, "webhook delivered");
                    return Ok(());
                }
                Ok(response)
                    if response.status().is_server_error()
                        || response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS =>
                {
                    last_error = Some(format!(
                        "transient HTTP status {} from notification webhook",
                        response.status()
                    ));
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "<response body unavailable>".to_owned());
                    return Err(AppError::Notification(format!(
                        "notification webhook rejected delivery with status {status}: {body}"
                    )));
                }
                Err(error) => {
                    last_error = Some(format!("notification webhook transport error: {error}"));
                }
            }

            if attempt < self.max_attempts {
                let delay = self.retry_backoff_ms.saturating_mul(u64::from(attempt));
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        Err(AppError::Notification(last_error.unwrap_or_else(|| {
            "notification webhook exhausted retries".to_owned()
        })))
    }
}
