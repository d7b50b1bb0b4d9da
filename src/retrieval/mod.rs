//! Retrieval Module
//!
//! Read-through access for callers: single records by lookup value or index
//! value, and ordered pages of records.
//!
//! On a miss the record is loaded from the store of truth, written back to the
//! cache (unless the store decision rejects it) and returned. Concurrent misses
//! for the same record each load and write; the last write wins.

mod batch;
mod single;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::cache::RecordCache;
use crate::error::{CacheError, Result};
use crate::record::{Record, RecordStore};

type StoreDecision<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;
type PostProcess = Arc<dyn Fn(Value) -> Value + Send + Sync>;

// == Read Options ==
/// Per-request retrieval settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Skip the cache lookup and reload from the store, overwriting the entry
    pub force_refresh: bool,
    /// Selects one representation variant of the record, e.g. ":en"
    pub key_suffix: String,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that bypass the cache lookup.
    pub fn refresh() -> Self {
        Self {
            force_refresh: true,
            ..Self::default()
        }
    }

    pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.key_suffix = suffix.into();
        self
    }
}

// == Retriever Builder ==
/// Declares how a consumer reads through one cache.
pub struct RetrieverBuilder<E> {
    cache: Arc<RecordCache<E>>,
    store: Arc<dyn RecordStore<E>>,
    lookup_field: Option<String>,
    cache_index: Option<String>,
    indexed: bool,
    store_decision: Option<StoreDecision<E>>,
    post_process: Option<PostProcess>,
}

impl<E: Record> RetrieverBuilder<E> {
    /// Field the consumer looks records up by. Must match the cache's lookup field.
    pub fn lookup_field(mut self, field: impl Into<String>) -> Self {
        self.lookup_field = Some(field.into());
        self
    }

    /// Resolve single lookups through the index named like the lookup field.
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Resolve single lookups through the named index.
    pub fn cache_index(mut self, index_name: impl Into<String>) -> Self {
        self.indexed = true;
        self.cache_index = Some(index_name.into());
        self
    }

    /// Records for which `decision` returns false are served but never cached.
    pub fn store_decision<F>(mut self, decision: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.store_decision = Some(Arc::new(decision));
        self
    }

    /// Applied to every value before it is returned, cached or not.
    pub fn post_process<F>(mut self, hook: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.post_process = Some(Arc::new(hook));
        self
    }

    // == Build ==
    pub fn build(self) -> Result<Retriever<E>> {
        let lookup_field = self
            .lookup_field
            .unwrap_or_else(|| self.cache.lookup_field().to_string());
        if lookup_field != self.cache.lookup_field() {
            return Err(CacheError::InvalidConfig(format!(
                "retriever looks up by '{}' but cache {} is keyed by '{}'",
                lookup_field,
                self.cache.identity(),
                self.cache.lookup_field()
            )));
        }

        let cache_index = match (self.indexed, self.cache_index) {
            (false, _) => None,
            (true, Some(name)) => Some(name),
            (true, None) => Some(lookup_field.clone()),
        };
        if let Some(index_name) = &cache_index {
            self.cache.ensure_index(index_name)?;
        }

        Ok(Retriever {
            cache: self.cache,
            store: self.store,
            lookup_field,
            cache_index,
            store_decision: self.store_decision,
            post_process: self.post_process,
        })
    }
}

// == Retriever ==
/// Read-through access to one cache and its store of truth.
pub struct Retriever<E> {
    cache: Arc<RecordCache<E>>,
    store: Arc<dyn RecordStore<E>>,
    lookup_field: String,
    cache_index: Option<String>,
    store_decision: Option<StoreDecision<E>>,
    post_process: Option<PostProcess>,
}

impl<E: Record> Retriever<E> {
    pub fn builder(cache: Arc<RecordCache<E>>, store: Arc<dyn RecordStore<E>>) -> RetrieverBuilder<E> {
        RetrieverBuilder {
            cache,
            store,
            lookup_field: None,
            cache_index: None,
            indexed: false,
            store_decision: None,
            post_process: None,
        }
    }

    pub fn cache(&self) -> &RecordCache<E> {
        &self.cache
    }

    pub fn lookup_field(&self) -> &str {
        &self.lookup_field
    }

    /// Index single lookups resolve through, if any.
    pub fn cache_index(&self) -> Option<&str> {
        self.cache_index.as_deref()
    }

    /// Caches a freshly loaded record if the store decision allows it and returns
    /// its serialized form either way.
    async fn cache_record(&self, record: &E, suffix: &str) -> Result<Value> {
        let cacheable = self
            .store_decision
            .as_ref()
            .map_or(true, |decision| decision(record));

        if cacheable {
            self.cache.set(record, suffix).await
        } else {
            self.cache.serialize(record)
        }
    }

    fn finish(&self, data: Value) -> Value {
        match &self.post_process {
            Some(hook) => hook(data),
            None => data,
        }
    }
}

impl<E> fmt::Debug for Retriever<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retriever")
            .field("cache", &self.cache)
            .field("lookup_field", &self.lookup_field)
            .field("cache_index", &self.cache_index)
            .finish_non_exhaustive()
    }
}
