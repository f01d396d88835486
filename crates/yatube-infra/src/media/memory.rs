use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use yatube_core::ports::{MediaError, MediaStorage};

use super::{check_reference, new_reference};

/// Keeps uploads in memory. Used by tests and the storage-less dev setup.
#[derive(Clone, Default)]
pub struct InMemoryMediaStorage {
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryMediaStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}

#[async_trait]
impl MediaStorage for InMemoryMediaStorage {
    async fn store(
        &self,
        upload_to: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String, MediaError> {
        let reference = new_reference(upload_to, extension)?;
        self.files
            .write()
            .await
            .insert(reference.clone(), bytes.to_vec());
        Ok(reference)
    }

    async fn open(&self, reference: &str) -> Result<Vec<u8>, MediaError> {
        check_reference(reference)?;
        self.files
            .read()
            .await
            .get(reference)
            .cloned()
            .ok_or_else(|| MediaError::NotFound(reference.to_string()))
    }

    async fn delete(&self, reference: &str) -> Result<(), MediaError> {
        check_reference(reference)?;
        self.files.write().await.remove(reference);
        Ok(())
    }
}
