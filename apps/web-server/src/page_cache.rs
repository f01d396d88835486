//! Whole-page cache for the index listing.
//!
//! Entries expire after a fixed TTL. Writes to posts never invalidate them,
//! so a cached page can be stale for up to one TTL; `clear` drops every
//! cached page at once.

use std::sync::Arc;
use std::time::Duration;

use yatube_core::ports::{Cache, CacheError};

const KEY_PREFIX: &str = "page:";

#[derive(Clone)]
pub struct PageCache {
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl PageCache {
    pub fn new(cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// `page:<path>?<query>`
    pub fn key(path: &str, query: &str) -> String {
        format!("{KEY_PREFIX}{path}?{query}")
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let hit = self.cache.get(key).await;
        tracing::debug!(key = %key, hit = hit.is_some(), "Page cache lookup");
        hit
    }

    /// Store a rendered page. A failing backend only costs the next request a render.
    pub async fn put(&self, key: &str, html: &str) {
        if let Err(e) = self.cache.set(key, html, Some(self.ttl)).await {
            tracing::warn!(key = %key, error = %e, "Failed to cache page");
        }
    }

    /// Drop every cached page.
    pub async fn clear(&self) -> Result<u64, CacheError> {
        let removed = self.cache.clear_prefix(KEY_PREFIX).await?;
        tracing::info!(removed, "Page cache cleared");
        Ok(removed)
    }
}
