//! Metadata stored in file-backed cache entries.

use crate::error::{FlowLockError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Contents of a cache entry file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// The cache key (file names are an encoded form of it).
    pub key: String,

    /// The value stored by the holder.
    pub value: String,

    /// Owner of the entry (e.g., `user@HOST`).
    pub owner: String,

    /// Process ID of the holder (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// When the entry was created (RFC3339).
    pub created_at: DateTime<Utc>,

    /// When the entry stops counting as held (RFC3339).
    pub expires_at: DateTime<Utc>,
}

impl EntryMetadata {
    /// Create metadata for an entry living `ttl` from now.
    pub fn new(key: &str, value: &str, ttl: std::time::Duration) -> Result<Self> {
        let ttl = Duration::from_std(ttl)
            .map_err(|e| FlowLockError::Cache(format!("invalid ttl {:?}: {}", ttl, e)))?;
        let created_at = Utc::now();
        let expires_at = created_at.checked_add_signed(ttl).ok_or_else(|| {
            FlowLockError::Cache(format!("ttl {} is too large to represent an expiry", ttl))
        })?;
        Ok(Self {
            key: key.to_string(),
            value: value.to_string(),
            owner: owner_string(),
            pid: Some(std::process::id()),
            created_at,
            expires_at,
        })
    }

    /// Parse entry metadata from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            FlowLockError::Cache(format!(
                "failed to read cache entry '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            FlowLockError::Cache(format!(
                "failed to parse cache entry '{}': {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// Serialize entry metadata to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| FlowLockError::Cache(format!("failed to serialize cache entry: {}", e)))
    }

    /// Age of the entry.
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.created_at)
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        let age = self.age();
        let seconds = age.num_seconds();
        let minutes = age.num_minutes();
        let hours = age.num_hours();
        let days = age.num_days();

        if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds % 60)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Whether the entry's time-to-live has elapsed.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Owner string recorded with cache entries and used as the lock sentinel.
pub fn owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}
