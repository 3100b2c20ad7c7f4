use async_trait::async_trait;
use staffhub_core::AppResult;
use staffhub_domain::NotificationRecord;

/// Location and size of a stored blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Public download URL.
    pub url: String,
    /// Stored size in bytes.
    pub size: u64,
}

/// Port for binary attachment storage.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Stores bytes under `path` and returns where they can be downloaded.
    async fn upload(
        &self,
        path: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> AppResult<StoredBlob>;

    /// Removes the blob under `path`. Missing blobs are not an error.
    async fn delete(&self, path: &str) -> AppResult<()>;
}

/// Port delivering one notification record to one recipient.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Short transport name for logs.
    fn name(&self) -> &'static str;

    /// Delivers one record.
    async fn deliver(&self, record: &NotificationRecord) -> AppResult<()>;
}

/// Port for sending email messages.
#[async_trait]
pub trait EmailService: Send + Sync {
    /// Sends a plain-text or HTML email.
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
    ) -> AppResult<()>;
}
