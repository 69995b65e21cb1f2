use super::{CacheLock, Lock, NoLock, SelectForUpdateLock};
use crate::backoff::Sleeper;
use crate::cache::Cache;
use crate::config::LockConfig;
use crate::error::{FlowLockError, Result};
use crate::process::{FlowType, ProcessKey};
use crate::store::ProcessStore;
use std::sync::Arc;
use std::time::Duration;

/// Runtime choice of lock strategy.
#[derive(Debug, Clone)]
pub enum LockStrategy {
    NoLock(NoLock),
    SelectForUpdate(SelectForUpdateLock),
    Cache(CacheLock),
}

impl LockStrategy {
    /// Build the strategy described by `config`.
    ///
    /// `cache` is required for the `cache_lock` kind and ignored otherwise.
    pub fn from_config(config: &LockConfig, cache: Option<Arc<dyn Cache>>) -> Result<Self> {
        config.validate()?;
        match config {
            LockConfig::NoLock => Ok(LockStrategy::NoLock(NoLock)),
            LockConfig::SelectForUpdate { nowait, attempts } => Ok(LockStrategy::SelectForUpdate(
                SelectForUpdateLock::new(*nowait, *attempts),
            )),
            LockConfig::CacheLock {
                attempts,
                expires_secs,
                key_prefix,
            } => {
                let cache = cache.ok_or_else(|| {
                    FlowLockError::Config(
                        "lock kind 'cache_lock' needs a cache backend".to_string(),
                    )
                })?;
                Ok(LockStrategy::Cache(
                    CacheLock::new(cache)
                        .with_attempts(*attempts)
                        .with_expires(Duration::from_secs(*expires_secs))
                        .with_key_prefix(key_prefix.clone()),
                ))
            }
        }
    }

    /// Replace the sleeper of a retrying strategy. `NoLock` never sleeps.
    pub fn with_sleeper(self, sleeper: Arc<dyn Sleeper>) -> Self {
        match self {
            LockStrategy::NoLock(lock) => LockStrategy::NoLock(lock),
            LockStrategy::SelectForUpdate(lock) => {
                LockStrategy::SelectForUpdate(lock.with_sleeper(sleeper))
            }
            LockStrategy::Cache(lock) => LockStrategy::Cache(lock.with_sleeper(sleeper)),
        }
    }

    /// Short name of the strategy, as used in configuration.
    pub fn kind(&self) -> &'static str {
        match self {
            LockStrategy::NoLock(_) => "no_lock",
            LockStrategy::SelectForUpdate(_) => "select_for_update",
            LockStrategy::Cache(_) => "cache_lock",
        }
    }
}

impl Default for LockStrategy {
    fn default() -> Self {
        LockStrategy::NoLock(NoLock)
    }
}

impl From<NoLock> for LockStrategy {
    fn from(lock: NoLock) -> Self {
        LockStrategy::NoLock(lock)
    }
}

impl From<SelectForUpdateLock> for LockStrategy {
    fn from(lock: SelectForUpdateLock) -> Self {
        LockStrategy::SelectForUpdate(lock)
    }
}

impl From<CacheLock> for LockStrategy {
    fn from(lock: CacheLock) -> Self {
        LockStrategy::Cache(lock)
    }
}

impl Lock for LockStrategy {
    fn acquire<S, T, E, F>(
        &self,
        store: &S,
        flow: &FlowType,
        key: &ProcessKey,
        work: F,
    ) -> std::result::Result<T, E>
    where
        S: ProcessStore,
        E: From<FlowLockError>,
        F: FnOnce(&mut S::Tx) -> std::result::Result<T, E>,
    {
        match self {
            LockStrategy::NoLock(lock) => lock.acquire(store, flow, key, work),
            LockStrategy::SelectForUpdate(lock) => lock.acquire(store, flow, key, work),
            LockStrategy::Cache(lock) => lock.acquire(store, flow, key, work),
        }
    }
}
