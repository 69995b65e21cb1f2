//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "flowlock.yaml";

/// Configuration for flowlock.
///
/// This struct represents the contents of `flowlock.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Lock strategy used for every flow built from this config.
    #[serde(default)]
    pub lock: LockConfig,

    // =========================================================================
    // Cache settings
    // =========================================================================
    /// Directory holding file-backed cache entries (default: ".flowlock/cache").
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lock: LockConfig::default(),
            cache_dir: default_cache_dir(),
        }
    }
}
