//! SMTP email service using the `lettre` crate.

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart, SinglePart, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use staffhub_application::EmailService;
use staffhub_core::{AppError, AppResult};
use tracing::debug;

/// SMTP email service configuration.
#[derive(Clone)]
pub struct SmtpEmailConfig {
    /// SMTP server hostname.
    pub host: String,
    /// SMTP server port.
    pub port: u16,
    /// SMTP username.
    pub username: String,
    /// SMTP password.
    pub password: String,
    /// Sender address, e.g. `Staffhub <noreply@example.com>`.
    pub from_address: String,
}

/// Email service relaying through an SMTP server.
#[derive(Clone)]
pub struct SmtpEmailService {
    from: Mailbox,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailService {
    /// Builds the SMTP relay. Fails on an unparsable sender or host.
    pub fn new(config: SmtpEmailConfig) -> AppResult<Self> {
        let from = config
            .from_address
            .parse::<Mailbox>()
            .map_err(|error| AppError::Validation(format!("invalid from address: {error}")))?;

        let credentials = Credentials::new(config.username, config.password);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|error| {
                AppError::Validation(format!("failed to create SMTP transport: {error}"))
            })?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self { from, mailer })
    }
}

#[async_trait]
impl EmailService for SmtpEmailService {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
    ) -> AppResult<()> {
        let to_mailbox = to.parse::<Mailbox>().map_err(|error| {
            AppError::Notification(format!("invalid recipient address '{to}': {error}"))
        })?;

        let builder = Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(subject);
        let message = match html_body {
            Some(html_body) => builder.multipart(MultiPart::alternative_plain_html(
                text_body.to_owned(),
                html_body.to_owned(),
            )),
            None => builder.singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(text_body.to_owned()),
            ),
        }
        .map_err(|error| AppError::Notification(format!("failed to build email: {error}")))?;

        self.mailer
            .send(message)
            .await
            .map_err(|error| AppError::Notification(format!("failed to send email: {error}")))?;

        debug!(to, subject, "email sent");
        Ok(())
    }
}
