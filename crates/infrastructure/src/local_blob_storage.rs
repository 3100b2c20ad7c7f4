use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use staffhub_application::{BlobStorage, StoredBlob};
use staffhub_core::{AppError, AppResult};
use tracing::debug;

/// Blob storage on the local filesystem, served under a public base URL.
#[derive(Debug, Clone)]
pub struct LocalBlobStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStorage {
    /// Creates a storage rooted at `root`. URLs are `{public_base_url}/{path}`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Returns the storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    fn resolve(&self, path: &str) -> AppResult<PathBuf> {
        let relative = Path::new(path);
        let is_plain = !path.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !is_plain {
            return Err(AppError::Validation(format!(
                "blob path '{path}' must be relative without '..' segments"
            )));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStorage {
    async fn upload(
        &self,
        path: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> AppResult<StoredBlob> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|error| {
                AppError::Persistence(format!("failed to create blob directory: {error}"))
            })?;
        }

        let size = u64::try_from(bytes.len()).map_err(|error| {
            AppError::Validation(format!("blob '{path}' is too large: {error}"))
        })?;
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|error| AppError::Persistence(format!("failed to write blob '{path}': {error}")))?;

        debug!(path, size, content_type, "blob stored");
        Ok(StoredBlob {
            url: format!("{}/{path}", self.public_base_url),
            size,
        })
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(AppError::Persistence(format!(
                "failed to delete blob '{path}': {error}"
            ))),
        }
    }
}
