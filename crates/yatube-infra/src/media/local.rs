use std::path::PathBuf;

use async_trait::async_trait;
use yatube_core::ports::{MediaError, MediaStorage};

use super::{check_reference, new_reference};

/// Stores uploads on the local filesystem under a media root.
#[derive(Debug, Clone)]
pub struct LocalMediaStorage {
    root: PathBuf,
}

impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, reference: &str) -> Result<PathBuf, MediaError> {
        check_reference(reference)?;
        Ok(self.root.join(reference))
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn store(
        &self,
        upload_to: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String, MediaError> {
        let reference = new_reference(upload_to, extension)?;
        let path = self.resolve(&reference)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MediaError::Io(e.to_string()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| MediaError::Io(e.to_string()))?;

        tracing::debug!(reference = %reference, size = bytes.len(), "Stored media file");
        Ok(reference)
    }

    async fn open(&self, reference: &str) -> Result<Vec<u8>, MediaError> {
        let path = self.resolve(reference)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(MediaError::NotFound(reference.to_string()))
            }
            Err(e) => Err(MediaError::Io(e.to_string())),
        }
    }

    async fn delete(&self, reference: &str) -> Result<(), MediaError> {
        let path = self.resolve(reference)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(reference = %reference, "Removed media file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MediaError::Io(e.to_string())),
        }
    }

    fn local_path(&self, reference: &str) -> Result<Option<PathBuf>, MediaError> {
        self.resolve(reference).map(Some)
    }
}
