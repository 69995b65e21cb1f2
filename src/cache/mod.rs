//! Key-value caches used as distributed mutex backends.
//!
//! A cache entry's presence *is* the lock. The only operation that matters
//! for correctness is [`Cache::add`]: it must insert only when the key is
//! absent, atomically with respect to every other worker sharing the cache.
//!
//! Two backends are provided:
//! - [`InMemoryCache`]: a `Mutex<HashMap>` shared by threads of one process
//! - [`FileCache`]: one file per key in a shared directory, created with
//!   exclusive-create semantics so separate processes can coordinate

pub mod file;
pub mod memory;
pub mod metadata;

use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;

pub use file::{CacheEntryInfo, FileCache};
pub use memory::InMemoryCache;
pub use metadata::{EntryMetadata, owner_string};

/// External cache offering atomic insert-if-absent.
pub trait Cache: Send + Sync {
    /// Store `value` under `key` for `ttl` unless a live entry exists.
    ///
    /// Returns `Ok(true)` if this call inserted the entry, `Ok(false)` if
    /// the key was already held.
    fn add(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;
}

impl<C: Cache + ?Sized> Cache for Arc<C> {
    fn add(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        (**self).add(key, value, ttl)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }
}
