use std::collections::HashSet;
use std::sync::Arc;

use staffhub_core::{AppError, AppResult};
use staffhub_domain::{Attachment, CollectionId, DocumentId};
use tracing::{info, warn};

use crate::delivery_ports::BlobStorage;

/// One file received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Original file name.
    pub file_name: String,
    /// MIME type reported by the client.
    pub content_type: Option<String>,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Uploads attachment files and removes the ones no longer referenced.
#[derive(Clone)]
pub struct AttachmentService {
    blobs: Arc<dyn BlobStorage>,
}

impl AttachmentService {
    /// Creates an attachment service.
    #[must_use]
    pub fn new(blobs: Arc<dyn BlobStorage>) -> Self {
        Self { blobs }
    }

    /// Stores files under `{collection}/{id}/{folder}/{name}` and returns their refs.
    pub async fn upload(
        &self,
        collection: CollectionId,
        entity_id: &DocumentId,
        folder: &str,
        files: Vec<Upload>,
    ) -> AppResult<Vec<Attachment>> {
        let folder = sanitize_segment(folder)
            .ok_or_else(|| AppError::Validation("attachment folder must not be empty".to_owned()))?;

        let mut attachments = Vec::with_capacity(files.len());
        for file in files {
            let name = sanitize_segment(&file.file_name).ok_or_else(|| {
                AppError::Validation(format!("invalid attachment name '{}'", file.file_name))
            })?;
            let path = format!("{collection}/{entity_id}/{folder}/{name}");
            let stored = self
                .blobs
                .upload(&path, file.content_type.as_deref(), file.bytes)
                .await?;
            attachments.push(Attachment::new(
                file.file_name.trim(),
                stored.url,
                stored.size,
                path,
            )?);
        }

        info!(
            collection = %collection,
            document_id = %entity_id,
            count = attachments.len(),
            "attachments uploaded"
        );
        Ok(attachments)
    }

    /// Deletes blobs present in `previous` but missing from `kept`. Returns the
    /// number removed; failed deletions are logged and skipped.
    pub async fn reconcile(&self, previous: &[Attachment], kept: &[Attachment]) -> usize {
        let kept_paths = kept.iter().map(Attachment::path).collect::<HashSet<_>>();
        let mut removed = 0;
        for attachment in previous
            .iter()
            .filter(|attachment| !kept_paths.contains(attachment.path()))
        {
            match self.blobs.delete(attachment.path()).await {
                Ok(()) => removed += 1,
                Err(error) => warn!(
                    path = attachment.path(),
                    error = %error,
                    "failed to delete unreferenced attachment"
                ),
            }
        }

        removed
    }
}

/// Keeps a path segment to safe characters. `None` when nothing usable remains.
fn sanitize_segment(value: &str) -> Option<String> {
    let cleaned = value
        .trim()
        .chars()
        .map(|character| {
            if character.is_ascii_alphanumeric() || matches!(character, '.' | '-' | '_') {
                character
            } else {
                '_'
            }
        })
        .collect::<String>();
    let cleaned = cleaned.trim_matches('.');

    (!cleaned.is_empty() && cleaned.chars().any(|character| character != '_'))
        .then(|| cleaned.to_owned())
}
