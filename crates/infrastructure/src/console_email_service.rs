//! Console email service for development. Writes messages to tracing output.

use async_trait::async_trait;
use staffhub_application::EmailService;
use staffhub_core::AppResult;
use tracing::info;

/// Development email service that logs messages instead of sending them.
#[derive(Clone, Default)]
pub struct ConsoleEmailService;

impl ConsoleEmailService {
    /// Creates a console email service.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmailService for ConsoleEmailService {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
    ) -> AppResult<()> {
        info!(
            to,
            subject,
            has_html = html_body.is_some(),
            "--- EMAIL (console) ---\nTo: {to}\nSubject: {subject}\n\n{text_body}\n--- END EMAIL ---"
        );

        Ok(())
    }
}
