//! RAII guard for a held cache lock entry.

use crate::cache::Cache;
use crate::error::Result;
use std::sync::Arc;
use tracing::warn;

/// Guard for a cache key acting as a lock.
///
/// When dropped, the key is deleted from the cache. If deletion fails, a
/// warning is logged but no panic occurs; the entry then lingers until its
/// expiry.
pub struct CacheKeyGuard {
    cache: Arc<dyn Cache>,

    /// The cache key being held.
    key: String,

    /// Whether the key has been released manually.
    released: bool,
}

impl CacheKeyGuard {
    /// Wrap a key that was just inserted into `cache`.
    pub(super) fn new(cache: Arc<dyn Cache>, key: String) -> Self {
        Self {
            cache,
            key,
            released: false,
        }
    }

    /// The held cache key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release the key now and report the outcome.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.cache.delete(&self.key)
    }
}

impl std::fmt::Debug for CacheKeyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheKeyGuard")
            .field("key", &self.key)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl Drop for CacheKeyGuard {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = self.cache.delete(&self.key)
        {
            warn!(key = %self.key, error = %e, "failed to release cache lock");
        }
    }
}
