//! In-Memory Backend Module
//!
//! HashMap storage with per-version namespacing, TTL expiration and
//! least-recently-used eviction once a capacity bound is reached.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{Backend, BackendStats, StoredEntry};
use crate::config::MemoryBackendConfig;
use crate::error::Result;

/// Physical key for `key` inside the `version` namespace.
///
/// The version is rendered first and terminated by ':', so two versions can
/// never produce the same physical key.
fn namespaced(key: &str, version: u32) -> String {
    format!("{}:{}", version, key)
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: HashMap<String, StoredEntry>,
    stats: BackendStats,
    /// Monotonic access counter, stamped on entries for LRU ordering
    clock: u64,
}

impl MemoryState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_least_recent(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            self.entries.remove(&key);
            self.stats.evictions += 1;
            debug!("Evicted least recently used entry: {}", key);
        }
    }
}

// == Memory Backend ==
/// In-process [`Backend`] suitable for a single node and for tests.
#[derive(Debug)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
    /// 0 = unbounded
    max_entries: usize,
}

impl MemoryBackend {
    // == Constructor ==
    /// Creates a backend holding at most `max_entries` entries (0 = unbounded).
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            max_entries,
        }
    }

    pub fn from_config(config: &MemoryBackendConfig) -> Self {
        Self::new(config.max_entries)
    }

    // == Stats ==
    /// Returns a snapshot of the backend counters.
    pub async fn stats(&self) -> BackendStats {
        let state = self.state.read().await;
        let mut stats = state.stats.clone();
        stats.total_entries = state.entries.len();
        stats
    }

    // == Purge Expired ==
    /// Removes every expired entry. Returns the number removed.
    pub async fn purge_expired(&self) -> usize {
        let mut state = self.state.write().await;
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired());
        let removed = before - state.entries.len();
        state.stats.expirations += removed as u64;
        removed
    }

    /// Number of entries held, expired ones included until they are purged.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get(&self, key: &str, version: u32) -> Result<Option<Vec<u8>>> {
        let physical = namespaced(key, version);
        // Write lock: reads update the access stamp and counters.
        let mut state = self.state.write().await;
        let access = state.tick();

        match state.entries.get_mut(&physical) {
            Some(entry) if !entry.is_expired() => {
                entry.last_access = access;
                let value = entry.value.clone();
                state.stats.hits += 1;
                return Ok(Some(value));
            }
            Some(_) => {
                state.entries.remove(&physical);
                state.stats.expirations += 1;
            }
            None => {}
        }
        state.stats.misses += 1;
        Ok(None)
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
        version: u32,
    ) -> Result<()> {
        let physical = namespaced(key, version);
        let mut state = self.state.write().await;
        let access = state.tick();

        let is_overwrite = state.entries.contains_key(&physical);
        if !is_overwrite && self.max_entries > 0 && state.entries.len() >= self.max_entries {
            state.evict_least_recent();
        }

        state
            .entries
            .insert(physical, StoredEntry::new(value, ttl, access));
        Ok(())
    }

    async fn delete(&self, key: &str, version: u32) -> Result<bool> {
        let physical = namespaced(key, version);
        let mut state = self.state.write().await;
        Ok(state.entries.remove(&physical).is_some())
    }

    async fn delete_prefix(&self, prefix: &str, version: u32) -> Result<usize> {
        let physical = namespaced(prefix, version);
        let mut state = self.state.write().await;
        let before = state.entries.len();
        state.entries.retain(|key, _| !key.starts_with(&physical));
        Ok(before - state.entries.len())
    }
}
