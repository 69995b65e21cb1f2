//! Flowlock: per-process task locks for workflow engines.
//!
//! A workflow engine advances many process instances concurrently. When
//! two workers act on the same process at once (two branches reaching a
//! join, a retried task racing the original) their state transitions must
//! be serialized. This crate provides the pluggable lock strategies that
//! do so, plus the collaborators they run against:
//!
//! - [`locks`]: the `Lock` trait, the three strategies and the
//!   [`FlowLock`] facade
//! - [`store`]: the transactional process store and an in-memory
//!   implementation with real row locks
//! - [`cache`]: insert-if-absent caches (in-memory and file-backed)
//! - [`backoff`]: randomized exponential backoff between attempts
//! - [`config`]: YAML configuration selecting a strategy

pub mod backoff;
pub mod cache;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod locks;
pub mod process;
pub mod store;

#[cfg(test)]
mod test_support;

pub use backoff::{Sleeper, ThreadSleeper};
pub use cache::{Cache, FileCache, InMemoryCache};
pub use config::{Config, LockConfig};
pub use error::{FlowLockError, Result};
pub use locks::{CacheLock, FlowLock, Lock, LockStrategy, NoLock, SelectForUpdateLock};
pub use process::{FlowType, ProcessKey};
pub use store::{InMemoryStore, MemoryTx, ProcessStore, StoreError, TxGuard, atomic};
