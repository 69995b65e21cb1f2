//! File-backed cache: one file per key in a shared directory.
//!
//! # Entry Files
//!
//! Each entry lives at `{dir}/{encoded-key}.lock`, where reserved
//! characters of the key are percent-encoded. Files are created with
//! **create_new** semantics (exclusive create), so only one worker can
//! insert a given key; this is what makes [`Cache::add`] atomic across
//! processes on the same filesystem.
//!
//! The file holds JSON [`EntryMetadata`] (owner, pid, created_at,
//! expires_at, value).
//!
//! # Expiry
//!
//! An entry whose `expires_at` has passed counts as absent and `add`
//! replaces it. Removing any entry file (reclaim, `delete`, purge) happens
//! while holding `{encoded-key}.lock.busy`, itself created with
//! create_new. The entry is re-read under the marker, so a worker acting on
//! a stale view can never remove an entry another worker just created.
//!
//! A worker that dies while holding a marker leaves it behind; reclaiming
//! that key then fails until `flowlock lock clear` removes both files.

use super::Cache;
use super::metadata::EntryMetadata;
use crate::error::{FlowLockError, Result};
use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::thread;
use tracing::{debug, warn};

const ENTRY_EXTENSION: &str = "lock";
const MARKER_EXTENSION: &str = "busy";

/// Tries and pause used by `delete` when a marker is held.
const MARKER_WAIT_TRIES: u32 = 50;
const MARKER_WAIT_PAUSE: Duration = Duration::from_millis(2);

/// State of an entry file as seen by one read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    Absent,
    Live,
    Expired,
}

/// Exclusive right to remove one entry file.
///
/// Held as a `.busy` file next to the entry; dropping it removes the file.
#[derive(Debug)]
struct EntryMarker {
    path: PathBuf,
}

impl EntryMarker {
    /// Take the marker for `entry`, or `None` if another worker holds it.
    fn try_acquire(entry: &Path) -> Result<Option<Self>> {
        let path = marker_path(entry);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Some(Self { path })),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(FlowLockError::Cache(format!(
                "failed to create marker '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    /// Take the marker, waiting briefly for a current holder to finish.
    fn acquire(entry: &Path) -> Result<Self> {
        for _ in 0..MARKER_WAIT_TRIES {
            if let Some(marker) = Self::try_acquire(entry)? {
                return Ok(marker);
            }
            thread::sleep(MARKER_WAIT_PAUSE);
        }
        Err(FlowLockError::Cache(format!(
            "entry '{}' is busy; remove '{}' if its holder crashed",
            entry.display(),
            marker_path(entry).display()
        )))
    }
}

impl Drop for EntryMarker {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path)
            && e.kind() != ErrorKind::NotFound
        {
            warn!(path = %self.path.display(), error = %e, "failed to remove entry marker");
        }
    }
}

fn marker_path(entry: &Path) -> PathBuf {
    let mut name = entry.as_os_str().to_os_string();
    name.push(".");
    name.push(MARKER_EXTENSION);
    PathBuf::from(name)
}

/// Information about a stored entry.
#[derive(Debug, Clone)]
pub struct CacheEntryInfo {
    /// The entry file path.
    pub path: PathBuf,

    /// The entry metadata.
    pub metadata: EntryMetadata,

    /// Whether the entry's time-to-live has elapsed.
    pub is_expired: bool,
}

impl std::fmt::Display for CacheEntryInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (owner: {}, age: {}{})",
            self.metadata.key,
            self.metadata.owner,
            self.metadata.age_string(),
            if self.is_expired { ", EXPIRED" } else { "" }
        )
    }
}

impl CacheEntryInfo {
    fn read(path: PathBuf) -> Result<Self> {
        let metadata = EntryMetadata::from_file(&path)?;
        let is_expired = metadata.is_expired();
        Ok(Self {
            path,
            metadata,
            is_expired,
        })
    }
}

/// Cache storing entries as files in a directory.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Create a cache rooted at `dir`. The directory is created lazily.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory holding entry files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", encode_key(key), ENTRY_EXTENSION))
    }

    /// Create the entry file exclusively.
    ///
    /// Returns `Ok(false)` if the file already exists.
    fn try_create(&self, path: &Path, metadata: &EntryMetadata) -> Result<bool> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| {
                FlowLockError::Cache(format!(
                    "failed to create cache directory '{}': {}",
                    self.dir.display(),
                    e
                ))
            })?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => {
                return Err(FlowLockError::Cache(format!(
                    "failed to create cache entry '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        let json = metadata.to_json()?;
        file.write_all(json.as_bytes()).map_err(|e| {
            // Clean up the entry on write failure
            let _ = fs::remove_file(path);
            FlowLockError::Cache(format!("failed to write cache entry: {}", e))
        })?;

        file.sync_all().map_err(|e| {
            let _ = fs::remove_file(path);
            FlowLockError::Cache(format!("failed to sync cache entry: {}", e))
        })?;

        Ok(true)
    }

    /// Read the state of the entry at `path`.
    ///
    /// An unreadable entry is treated as live: its writer may still be
    /// between the exclusive create and the metadata write.
    fn state_at(path: &Path) -> EntryState {
        if !path.exists() {
            return EntryState::Absent;
        }
        match EntryMetadata::from_file(path) {
            Ok(meta) if meta.is_expired() => EntryState::Expired,
            Ok(_) => EntryState::Live,
            Err(_) if !path.exists() => EntryState::Absent,
            Err(_) => EntryState::Live,
        }
    }

    /// List all entries, sorted by key.
    pub fn list_entries(&self) -> Result<Vec<CacheEntryInfo>> {
        let mut entries = Vec::new();

        if !self.dir.exists() {
            return Ok(entries);
        }

        let dir = fs::read_dir(&self.dir).map_err(|e| {
            FlowLockError::Cache(format!(
                "failed to read cache directory '{}': {}",
                self.dir.display(),
                e
            ))
        })?;

        for entry in dir {
            let entry = entry.map_err(|e| {
                FlowLockError::Cache(format!("failed to read cache directory entry: {}", e))
            })?;

            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }

            // Entries being written or removed concurrently are skipped
            if let Ok(info) = CacheEntryInfo::read(path) {
                entries.push(info);
            }
        }

        entries.sort_by(|a, b| a.metadata.key.cmp(&b.metadata.key));
        Ok(entries)
    }

    /// Remove the entry for `key`, returning what was removed.
    ///
    /// This is an operator override: a marker left by a crashed worker is
    /// removed as well. The caller is responsible for verifying that
    /// clearing a possibly live entry is appropriate.
    pub fn clear(&self, key: &str) -> Result<CacheEntryInfo> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Err(FlowLockError::UserError(format!(
                "cache entry '{}' does not exist at: {}",
                key,
                path.display()
            )));
        }

        let info = CacheEntryInfo::read(path.clone())?;
        remove_entry(&path)?;
        remove_entry(&marker_path(&path))?;
        Ok(info)
    }

    /// Remove every expired entry, returning what was removed.
    ///
    /// Entries whose marker is held by another worker are skipped.
    pub fn purge_expired(&self) -> Result<Vec<CacheEntryInfo>> {
        let mut purged = Vec::new();
        for info in self.list_entries()? {
            if !info.is_expired {
                continue;
            }
            let Some(_marker) = EntryMarker::try_acquire(&info.path)? else {
                continue;
            };
            if Self::state_at(&info.path) == EntryState::Expired {
                remove_entry(&info.path)?;
                purged.push(info);
            }
        }
        Ok(purged)
    }
}

impl Cache for FileCache {
    fn add(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let path = self.entry_path(key);
        let metadata = EntryMetadata::new(key, value, ttl)?;

        if self.try_create(&path, &metadata)? {
            return Ok(true);
        }

        let Some(_marker) = EntryMarker::try_acquire(&path)? else {
            return Ok(false);
        };

        // Only marker holders remove entries, so this read stays valid
        match Self::state_at(&path) {
            EntryState::Live => Ok(false),
            EntryState::Absent => self.try_create(&path, &metadata),
            EntryState::Expired => {
                debug!(key, path = %path.display(), "reclaiming expired cache entry");
                remove_entry(&path)?;
                self.try_create(&path, &metadata)
            }
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(());
        }
        let _marker = EntryMarker::acquire(&path)?;
        remove_entry(&path)
    }
}

fn remove_entry(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(FlowLockError::Cache(format!(
            "failed to remove cache entry '{}': {}",
            path.display(),
            e
        ))),
    }
}

/// Encode a key into a file name: `[A-Za-z0-9._-]` pass through, every
/// other byte becomes `%XX`.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => {
                encoded.push(byte as char)
            }
            _ => {
                let _ = write!(encoded, "%{:02X}", byte);
            }
        }
    }
    encoded
}
