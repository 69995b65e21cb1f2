//! Process lock strategies.
//!
//! A lock strategy serializes state transitions of one process. The
//! workflow engine hands it the protected work as a closure; the strategy
//! acquires whatever it needs, runs the work inside a transaction exactly
//! once, and releases everything on every exit path.
//!
//! # Strategies
//!
//! - [`NoLock`]: transaction only, no mutual exclusion. Not suitable for
//!   flows with join points.
//! - [`SelectForUpdateLock`]: exclusive row lock on the process record,
//!   retried with backoff.
//! - [`CacheLock`]: insert-if-absent of `lock-{flow}/{key}` in a shared
//!   cache, retried with backoff, key deleted afterwards.
//!
//! [`LockStrategy`] selects one of them at runtime (typically from
//! configuration) and [`FlowLock`] binds a strategy and a store to a flow
//! type for the engine.
//!
//! # Release Guarantees
//!
//! Row locks are released by the transaction guard (commit or rollback,
//! including on panic). Cache entries are released by an RAII guard that
//! deletes the key when dropped; if deletion fails a warning is logged and
//! the entry's expiry takes over.

mod cache_lock;
mod flow_lock;
mod guard;
mod no_lock;
mod retry;
mod select_for_update;
mod strategy;


use crate::error::FlowLockError;
use crate::process::{FlowType, ProcessKey};
use crate::store::ProcessStore;

// Re-export public API
pub use cache_lock::CacheLock;
pub use flow_lock::FlowLock;
pub use guard::CacheKeyGuard;
pub use no_lock::NoLock;
pub use retry::AttemptOutcome;
pub use select_for_update::SelectForUpdateLock;
pub use strategy::LockStrategy;

/// Default number of acquisition attempts for retrying strategies.
pub const DEFAULT_ATTEMPTS: u32 = 5;

/// Default lifetime of a cache lock entry, in seconds.
pub const DEFAULT_EXPIRES_SECS: u64 = 120;

/// Default prefix of cache lock keys.
pub const DEFAULT_KEY_PREFIX: &str = "lock";

/// A strategy that runs protected work with exclusive access to a process.
pub trait Lock: Send + Sync {
    /// Run `work` once under this strategy's guarantees.
    ///
    /// Returns the work's result, the work's own error unchanged, or
    /// [`FlowLockError::LockFailed`] (converted into `E`) when the attempt
    /// budget runs out.
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
        F: FnOnce(&mut S::Tx) -> Result<T, E>;
}
