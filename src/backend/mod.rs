//! Backend Module
//!
//! The key/value contract every cache definition writes through, a registry of
//! named backends, and an in-process implementation.

mod entry;
mod memory;
mod stats;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CacheError, Result};

pub use entry::StoredEntry;
pub use memory::MemoryBackend;
pub use stats::BackendStats;

/// Name a registry hands out when a definition does not pick a backend.
pub const DEFAULT_BACKEND: &str = "default";

// == Backend Contract ==
/// Versioned key/value storage with TTL and prefix deletion.
///
/// Every operation takes a `version`; entries written under one version are
/// invisible to every other version, so generations can share one physical store.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Returns the stored bytes, or None on miss or expiry.
    async fn get(&self, key: &str, version: u32) -> Result<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value and lifetime.
    ///
    /// A `ttl` of None never expires.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>, version: u32)
        -> Result<()>;

    /// Removes a single key. Returns whether it existed.
    async fn delete(&self, key: &str, version: u32) -> Result<bool>;

    /// Removes every key starting with `prefix`. Returns the number removed.
    async fn delete_prefix(&self, prefix: &str, version: u32) -> Result<usize>;
}

// == Backend Registry ==
/// Named backends that cache definitions resolve against at build time.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn Backend>>,
}

impl BackendRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding `backend` under [`DEFAULT_BACKEND`].
    pub fn with_default(backend: Arc<dyn Backend>) -> Self {
        let mut registry = Self::new();
        registry.register(DEFAULT_BACKEND, backend);
        registry
    }

    /// Registers `backend` under `name`, replacing any earlier registration.
    pub fn register(&mut self, name: impl Into<String>, backend: Arc<dyn Backend>) {
        self.backends.insert(name.into(), backend);
    }

    /// Looks up a backend by name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Backend>> {
        self.backends
            .get(name)
            .cloned()
            .ok_or_else(|| CacheError::UnknownBackend(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.backends.contains_key(name)
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.backends.keys().collect();
        names.sort();
        f.debug_struct("BackendRegistry")
            .field("backends", &names)
            .finish()
    }
}
