//! Configuration Module
//!
//! Settings for the bundled in-memory backend (loaded from environment variables)
//! and the per-cache options consumed by [`crate::cache::CacheBuilder`].

use std::env;
use std::time::Duration;

use serde::Deserialize;

/// In-memory backend configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct MemoryBackendConfig {
    /// Maximum number of entries held across all versions, 0 = unbounded
    pub max_entries: usize,
    /// Background expiry sweep interval in seconds
    pub cleanup_interval: u64,
}

impl MemoryBackendConfig {
    /// Creates a new config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_ENTRIES` - Maximum backend entries (default: 10000)
    /// - `CACHE_CLEANUP_INTERVAL` - Expiry sweep frequency in seconds (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env::var("CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_entries),
            cleanup_interval: env::var("CACHE_CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cleanup_interval),
        }
    }
}

impl Default for MemoryBackendConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            cleanup_interval: 30,
        }
    }
}

/// Options shared by every cache definition.
///
/// Every field has a default, so a definition can be deserialized from a partial
/// document such as `{"backend": "sessions", "ttl_secs": 60}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    /// Record attribute used as the primary lookup value
    pub lookup_field: String,
    /// Prepended to every key of this cache
    pub key_prefix: String,
    /// Store values as zlib-compressed JSON
    pub compress: bool,
    /// Name of a backend registered in the [`crate::backend::BackendRegistry`]
    pub backend: String,
    /// Key generation; bumping it orphans every older entry
    pub version: u32,
    /// Entry lifetime in seconds, None = never expires
    pub ttl_secs: Option<u64>,
}

impl CacheOptions {
    /// Entry lifetime as a Duration.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            lookup_field: "pk".to_string(),
            key_prefix: String::new(),
            compress: true,
            backend: "default".to_string(),
            version: 1,
            ttl_secs: None,
        }
    }
}
