//! Media storage port - where uploaded attachments live.

use std::path::PathBuf;

use async_trait::async_trait;

/// Stores uploaded files and hands back a retrievable reference.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Store `bytes` under the `upload_to` directory.
    ///
    /// `extension` is the file extension without the dot. Returns the stored
    /// reference, relative to the media root (e.g. `posts/<uuid>.png`).
    async fn store(&self, upload_to: &str, extension: &str, bytes: &[u8])
    -> Result<String, MediaError>;

    /// Read back a stored file.
    async fn open(&self, reference: &str) -> Result<Vec<u8>, MediaError>;

    /// Remove a stored file. A missing file is not an error.
    async fn delete(&self, reference: &str) -> Result<(), MediaError>;

    /// Where the file lives on disk, for backends that keep files there.
    fn local_path(&self, _reference: &str) -> Result<Option<PathBuf>, MediaError> {
        Ok(None)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Media not found: {0}")]
    NotFound(String),

    #[error("Invalid media reference: {0}")]
    InvalidReference(String),

    #[error("Media I/O failed: {0}")]
    Io(String),
}
