//! Primary Cache Module
//!
//! Stores the serialized form of a record under a key derived from its
//! lookup value.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use super::{IndexDefinition, KEY_SEPARATOR};
use crate::backend::Backend;
use crate::codec::ValueCodec;
use crate::config::CacheOptions;
use crate::error::{CacheError, Result};
use crate::record::{LookupValue, Record, RecordFilter, RecordSerializer, RecordStore};

// == Record Cache ==
/// One validated cache definition bound to its backend.
///
/// Built once with [`super::CacheBuilder`] and shared by reference (usually in
/// an `Arc`) with every retriever and invalidator that uses it.
pub struct RecordCache<E> {
    pub(super) identity: String,
    pub(super) options: CacheOptions,
    pub(super) codec: ValueCodec,
    pub(super) backend: Arc<dyn Backend>,
    pub(super) serializer: Arc<dyn RecordSerializer<E>>,
    pub(super) indexes: Vec<IndexDefinition<E>>,
}

impl<E: Record> RecordCache<E> {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    pub fn lookup_field(&self) -> &str {
        &self.options.lookup_field
    }

    /// The record's primary lookup value.
    ///
    /// A record without the configured lookup field means the definition does not
    /// fit the record type, so this is reported as a configuration error.
    pub fn lookup_value(&self, record: &E) -> Result<LookupValue> {
        record
            .attribute(&self.options.lookup_field)
            .ok_or_else(|| CacheError::MissingLookupField(self.options.lookup_field.clone()))
    }

    // == Make Key ==
    /// `prefix + identity + ":" + lookup + suffix`
    ///
    /// Keys stay unambiguous only for suffixes that are empty or start with ':'.
    /// Reads and writes reject any other suffix.
    pub fn make_key(&self, lookup: &LookupValue, suffix: &str) -> String {
        format!(
            "{}{}{}{}{}",
            self.options.key_prefix, self.identity, KEY_SEPARATOR, lookup, suffix
        )
    }

    /// [`Self::make_key`] for a suffix that has been checked.
    ///
    /// Without the leading separator `(1, "0")` and `(10, "")` would share a key.
    fn checked_key(&self, lookup: &LookupValue, suffix: &str) -> Result<String> {
        if !suffix.is_empty() && !suffix.starts_with(KEY_SEPARATOR) {
            return Err(CacheError::InvalidConfig(format!(
                "key suffix '{}' must start with '{}'",
                suffix, KEY_SEPARATOR
            )));
        }
        Ok(self.make_key(lookup, suffix))
    }

    /// Runs the configured serializer without touching the cache.
    pub fn serialize(&self, record: &E) -> Result<Value> {
        self.serializer.serialize(record)
    }

    // == Get ==
    /// Cached representation for `lookup`, or None on miss.
    pub async fn get(&self, lookup: &LookupValue, suffix: &str) -> Result<Option<Value>> {
        let key = self.checked_key(lookup, suffix)?;
        let bytes = self.backend.get(&key, self.options.version).await?;
        if bytes.is_some() {
            debug!("Cache hit: {}", key);
        } else {
            debug!("Cache miss: {}", key);
        }
        self.codec.decode(bytes.as_deref())
    }

    // == Set ==
    /// Serializes the record, stores it and returns what was stored.
    pub async fn set(&self, record: &E, suffix: &str) -> Result<Value> {
        let data = self.serialize(record)?;
        self.set_data(record, &data, suffix).await?;
        Ok(data)
    }

    // == Set Data ==
    /// Stores an already serialized representation of the record, then rewrites
    /// every index entry the record currently produces.
    pub async fn set_data(&self, record: &E, data: &Value, suffix: &str) -> Result<()> {
        let lookup = self.lookup_value(record)?;
        let key = self.checked_key(&lookup, suffix)?;
        let encoded = self.codec.encode(data)?;

        self.backend
            .set(&key, encoded, self.options.ttl(), self.options.version)
            .await?;
        self.set_indexes(record).await
    }

    // == Delete ==
    /// Removes the record's index entries, then every cached variant of the record.
    ///
    /// Variants are matched by key prefix, so all suffixes go at once. Returns the
    /// number of primary entries removed.
    pub async fn delete(&self, record: &E, suffix: &str) -> Result<usize> {
        let lookup = self.lookup_value(record)?;
        let key = self.checked_key(&lookup, suffix)?;
        self.delete_indexes(record).await?;

        let removed = self
            .backend
            .delete_prefix(&key, self.options.version)
            .await?;
        debug!("Deleted {} cached entries for {}", removed, key);
        Ok(removed)
    }

    // == Populate ==
    /// Caches every record the store returns for `filter`.
    ///
    /// Stops at the first failure; records written before it stay cached.
    pub async fn populate<S>(&self, store: &S, filter: &RecordFilter, suffix: &str) -> Result<usize>
    where
        S: RecordStore<E> + ?Sized,
    {
        let records = store.filter(filter).await?;
        for record in &records {
            self.set(record, suffix).await?;
        }
        info!("Populated {} cache with {} records", self.identity, records.len());
        Ok(records.len())
    }
}

impl<E> fmt::Debug for RecordCache<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordCache")
            .field("identity", &self.identity)
            .field("options", &self.options)
            .field("indexes", &self.indexes)
            .finish_non_exhaustive()
    }
}
