use super::guard::CacheKeyGuard;
use super::retry::{AttemptOutcome, back_off, lock_failed};
use super::{DEFAULT_ATTEMPTS, DEFAULT_EXPIRES_SECS, DEFAULT_KEY_PREFIX, Lock};
use crate::backoff::{Sleeper, ThreadSleeper};
use crate::cache::{Cache, owner_string};
use crate::error::FlowLockError;
use crate::process::{self, FlowType, ProcessKey};
use crate::store::{ProcessStore, atomic};
use std::sync::Arc;
use std::time::Duration;
use tracing::{trace, warn};

/// Task lock based on a shared cache.
///
/// Acquisition inserts `lock-{flow}/{key}` with insert-if-absent semantics,
/// so the backend's `add` must be atomic across all workers (memcached
/// style `add`, [`FileCache`](crate::cache::FileCache), or an
/// [`InMemoryCache`](crate::cache::InMemoryCache) shared by threads).
///
/// Each attempt first checks that the process row exists and only then
/// tries the insert. The check and the insert are separate steps; a row
/// deleted in between still gets locked, and the protected work then sees
/// the missing row itself.
///
/// The key is deleted once the work finishes, whatever the outcome. A
/// holder that dies without releasing is covered by the entry's expiry:
/// the process stays locked for at most `expires`.
#[derive(Clone)]
pub struct CacheLock {
    cache: Arc<dyn Cache>,
    attempts: u32,
    expires: Duration,
    key_prefix: String,
    sentinel: String,
    sleeper: Arc<dyn Sleeper>,
}

impl CacheLock {
    /// Cache lock with 5 attempts and a 120 second expiry.
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self {
            cache,
            attempts: DEFAULT_ATTEMPTS,
            expires: Duration::from_secs(DEFAULT_EXPIRES_SECS),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            sentinel: format!("{}:{}", owner_string(), std::process::id()),
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_expires(mut self, expires: Duration) -> Self {
        self.expires = expires;
        self
    }

    /// Replace the `lock` prefix of cache keys.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Replace the sleeper used between attempts.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn expires(&self) -> Duration {
        self.expires
    }

    /// Cache key guarding the given process.
    pub fn lock_key(&self, flow: &FlowType, key: &ProcessKey) -> String {
        process::lock_key(&self.key_prefix, flow, key)
    }

    /// Try to insert the lock key, retrying with backoff.
    fn acquire_key<S: ProcessStore>(
        &self,
        store: &S,
        flow: &FlowType,
        key: &ProcessKey,
    ) -> Result<CacheKeyGuard, FlowLockError> {
        let lock_key = self.lock_key(flow, key);

        for attempt in 0..self.attempts {
            if store.exists(flow, key)?
                && self.cache.add(&lock_key, &self.sentinel, self.expires)?
            {
                trace!(key = %lock_key, attempt, outcome = %AttemptOutcome::Acquired, "cache lock held");
                return Ok(CacheKeyGuard::new(Arc::clone(&self.cache), lock_key));
            }
            back_off(self.sleeper.as_ref(), flow, key, attempt, self.attempts)?;
        }

        Err(lock_failed(flow))
    }
}

impl std::fmt::Debug for CacheLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLock")
            .field("attempts", &self.attempts)
            .field("expires", &self.expires)
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

impl Lock for CacheLock {
    fn acquire<S, T, E, F>(
        &self,
        store: &S,
        flow: &FlowType,
        key: &ProcessKey,
        work: F,
    ) -> Result<T, E>
    where
        S: ProcessStore,
        E: From<FlowLockError>,
        F: FnOnce(&mut S::Tx) -> Result<T, E>,
    {
        let guard = self.acquire_key(store, flow, key)?;

        // The guard deletes the key on unwind as well
        let outcome = atomic(store, work);

        if let Err(e) = guard.release() {
            warn!(flow = %flow, key = %key, error = %e, "failed to release cache lock; it will expire");
        }
        outcome
    }
}
