//! Cache Definition Module
//!
//! Builds a [`RecordCache`] from options, a serializer and index declarations,
//! rejecting bad definitions before the cache ever serves a request.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::BackendRegistry;
use crate::codec::ValueCodec;
use crate::config::CacheOptions;
use crate::error::{CacheError, Result};
use crate::record::{Record, RecordSerializer};

use super::RecordCache;

type Extractor<E> = Arc<dyn Fn(&E) -> Vec<String> + Send + Sync>;

// == Index Definition ==
/// A named secondary index and the function producing its values for a record.
pub struct IndexDefinition<E> {
    name: String,
    extractor: Extractor<E>,
}

impl<E> IndexDefinition<E> {
    pub fn new<F>(name: impl Into<String>, extractor: F) -> Self
    where
        F: Fn(&E) -> Vec<String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            extractor: Arc::new(extractor),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index values the record currently contributes, possibly none.
    pub fn values(&self, record: &E) -> Vec<String> {
        (self.extractor)(record)
    }
}

impl<E> Clone for IndexDefinition<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            extractor: Arc::clone(&self.extractor),
        }
    }
}

impl<E> fmt::Debug for IndexDefinition<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexDefinition")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// == Cache Builder ==
/// Declares one cache: identity, options, serializer and indexes.
///
/// # Example
/// ```ignore
/// let cache = CacheBuilder::new("Article", JsonSerializer)
///     .key_prefix("api:")
///     .ttl(Duration::from_secs(300))
///     .index("slug", |a: &Article| vec![a.slug.clone()])
///     .build(&registry)?;
/// ```
pub struct CacheBuilder<E> {
    identity: String,
    options: CacheOptions,
    serializer: Arc<dyn RecordSerializer<E>>,
    indexes: Vec<IndexDefinition<E>>,
}

impl<E: Record> CacheBuilder<E> {
    /// Starts a definition. `identity` names the cache inside every key it writes.
    pub fn new<S>(identity: impl Into<String>, serializer: S) -> Self
    where
        S: RecordSerializer<E> + 'static,
    {
        Self {
            identity: identity.into(),
            options: CacheOptions::default(),
            serializer: Arc::new(serializer),
            indexes: Vec::new(),
        }
    }

    /// Replaces all options at once, e.g. with a deserialized [`CacheOptions`].
    pub fn options(mut self, options: CacheOptions) -> Self {
        self.options = options;
        self
    }

    pub fn lookup_field(mut self, field: impl Into<String>) -> Self {
        self.options.lookup_field = field.into();
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.key_prefix = prefix.into();
        self
    }

    pub fn compress(mut self, enabled: bool) -> Self {
        self.options.compress = enabled;
        self
    }

    pub fn backend(mut self, name: impl Into<String>) -> Self {
        self.options.backend = name.into();
        self
    }

    pub fn version(mut self, version: u32) -> Self {
        self.options.version = version;
        self
    }

    /// Entry lifetime, truncated to whole seconds. A lifetime under one second
    /// is rejected by [`Self::build`].
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.options.ttl_secs = Some(ttl.as_secs());
        self
    }

    /// Declares a secondary index.
    pub fn index<F>(mut self, name: impl Into<String>, extractor: F) -> Self
    where
        F: Fn(&E) -> Vec<String> + Send + Sync + 'static,
    {
        self.indexes.push(IndexDefinition::new(name, extractor));
        self
    }

    // == Build ==
    /// Validates the definition and resolves its backend.
    pub fn build(self, registry: &BackendRegistry) -> Result<RecordCache<E>> {
        validate_name("identity", &self.identity)?;
        if self.options.lookup_field.is_empty() {
            return Err(CacheError::InvalidConfig(
                "lookup_field cannot be empty".to_string(),
            ));
        }
        if self.options.ttl_secs == Some(0) {
            return Err(CacheError::InvalidConfig(
                "ttl must be at least one second".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for index in &self.indexes {
            validate_name("index name", index.name())?;
            if !seen.insert(index.name()) {
                return Err(CacheError::InvalidConfig(format!(
                    "index name '{}' is declared more than once",
                    index.name()
                )));
            }
        }

        let backend = registry.resolve(&self.options.backend)?;

        Ok(RecordCache {
            codec: ValueCodec::new(self.options.compress),
            identity: self.identity,
            options: self.options,
            backend,
            serializer: self.serializer,
            indexes: self.indexes,
        })
    }
}

/// Names are embedded in keys between ':' separators.
fn validate_name(what: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CacheError::InvalidConfig(format!("{} cannot be empty", what)));
    }
    if name.contains(':') {
        return Err(CacheError::InvalidConfig(format!(
            "{} '{}' cannot contain ':'",
            what, name
        )));
    }
    Ok(())
}
