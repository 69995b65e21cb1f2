//! In-process cache with per-entry expiry.

use super::Cache;
use crate::error::{FlowLockError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Cache backed by a `Mutex<HashMap>`.
///
/// `add` checks and inserts under one mutex acquisition, so it is atomic
/// for every thread sharing the same instance. Expired entries are
/// treated as absent and replaced.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| FlowLockError::Cache("cache mutex poisoned".to_string()))
    }

    /// Value of a live entry.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Utc::now();
        Ok(self
            .entries()?
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone()))
    }

    /// Whether a live entry exists for `key`.
    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Number of live entries.
    pub fn len(&self) -> Result<usize> {
        let now = Utc::now();
        Ok(self
            .entries()?
            .values()
            .filter(|entry| entry.expires_at > now)
            .count())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Cache for InMemoryCache {
    fn add(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| FlowLockError::Cache(format!("invalid ttl {:?}: {}", ttl, e)))?;
        let now = Utc::now();
        let expires_at = now.checked_add_signed(ttl).ok_or_else(|| {
            FlowLockError::Cache(format!("ttl {} is too large to represent an expiry", ttl))
        })?;
        let mut entries = self.entries()?;

        if let Some(existing) = entries.get(key)
            && existing.expires_at > now
        {
            return Ok(false);
        }

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(true)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}
