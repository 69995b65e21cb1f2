//! Configuration types and defaults for flowlock.
//!
//! This module defines the lock strategy enum and the default value
//! functions used by the Config struct.

use crate::error::{FlowLockError, Result};
use crate::locks::{DEFAULT_ATTEMPTS, DEFAULT_EXPIRES_SECS, DEFAULT_KEY_PREFIX};
use serde::{Deserialize, Serialize};

/// Lock strategy selection, tagged by `kind`.
///
/// ```yaml
/// lock:
///   kind: cache_lock
///   attempts: 3
///   expires_secs: 60
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LockConfig {
    /// Transaction only, no mutual exclusion (default).
    #[default]
    NoLock,

    /// Exclusive row lock on the process record.
    SelectForUpdate {
        /// Fail fast on contention instead of blocking in the store.
        #[serde(default = "default_true")]
        nowait: bool,

        /// Acquisition attempts before giving up.
        #[serde(default = "default_attempts")]
        attempts: u32,
    },

    /// Insert-if-absent entry in a shared cache.
    CacheLock {
        /// Acquisition attempts before giving up.
        #[serde(default = "default_attempts")]
        attempts: u32,

        /// Lifetime of a lock entry in seconds.
        #[serde(default = "default_expires_secs")]
        expires_secs: u64,

        /// Prefix of lock keys (`{prefix}-{flow}/{key}`).
        #[serde(default = "default_key_prefix")]
        key_prefix: String,
    },
}

impl LockConfig {
    /// Validate strategy parameters.
    ///
    /// Validation rules:
    /// - `attempts` must be positive
    /// - `expires_secs` must be positive and at most one year
    /// - `key_prefix` must be non-empty and must not contain '/'
    pub fn validate(&self) -> Result<()> {
        match self {
            LockConfig::NoLock => Ok(()),
            LockConfig::SelectForUpdate { attempts, .. } => validate_attempts(*attempts),
            LockConfig::CacheLock {
                attempts,
                expires_secs,
                key_prefix,
            } => {
                validate_attempts(*attempts)?;

                if *expires_secs == 0 {
                    return Err(FlowLockError::Config(
                        "lock.expires_secs must be greater than 0".to_string(),
                    ));
                }
                if *expires_secs > MAX_EXPIRES_SECS {
                    return Err(FlowLockError::Config(format!(
                        "lock.expires_secs must be at most {} (found {})",
                        MAX_EXPIRES_SECS, expires_secs
                    )));
                }

                if key_prefix.is_empty() {
                    return Err(FlowLockError::Config(
                        "lock.key_prefix must be non-empty".to_string(),
                    ));
                }
                if key_prefix.contains('/') {
                    return Err(FlowLockError::Config(format!(
                        "lock.key_prefix must not contain '/' (found '{}')",
                        key_prefix
                    )));
                }

                Ok(())
            }
        }
    }

    /// Prefix of cache lock keys; the default for non-cache strategies.
    pub fn key_prefix(&self) -> &str {
        match self {
            LockConfig::CacheLock { key_prefix, .. } => key_prefix,
            _ => DEFAULT_KEY_PREFIX,
        }
    }
}

/// Upper bound for `expires_secs`: one year.
pub const MAX_EXPIRES_SECS: u64 = 365 * 24 * 60 * 60;

fn validate_attempts(attempts: u32) -> Result<()> {
    if attempts == 0 {
        return Err(FlowLockError::Config(
            "lock.attempts must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

// Default value functions for serde
pub(crate) fn default_attempts() -> u32 {
    DEFAULT_ATTEMPTS
}
pub(crate) fn default_expires_secs() -> u64 {
    DEFAULT_EXPIRES_SECS
}
pub(crate) fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}
pub(crate) fn default_cache_dir() -> String {
    ".flowlock/cache".to_string()
}
pub(crate) fn default_true() -> bool {
    true
}
