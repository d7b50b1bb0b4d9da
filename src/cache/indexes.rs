//! Secondary Index Module
//!
//! Index entries map `(index name, index value)` to a primary lookup value.
//! They are rewritten wholesale whenever the owning record is stored and are
//! never diffed: a value the record stops producing keeps pointing at it until
//! another record claims it or [`RecordCache::delete_index`] removes it.

use serde_json::Value;
use tracing::debug;

use super::{IndexDefinition, RecordCache, INDEX_MARKER, KEY_SEPARATOR};
use crate::error::{CacheError, Result};
use crate::record::{LookupValue, Record};

impl<E: Record> RecordCache<E> {
    /// Declared index names, in declaration order.
    pub fn index_names(&self) -> impl Iterator<Item = &str> {
        self.indexes.iter().map(|index| index.name())
    }

    pub fn has_index(&self, index_name: &str) -> bool {
        self.indexes.iter().any(|index| index.name() == index_name)
    }

    /// The declared index called `index_name`.
    pub fn index(&self, index_name: &str) -> Result<&IndexDefinition<E>> {
        self.indexes
            .iter()
            .find(|index| index.name() == index_name)
            .ok_or_else(|| {
                CacheError::UnknownIndex(format!(
                    "'{}' is not an index of {}",
                    index_name, self.identity
                ))
            })
    }

    /// Fails with [`CacheError::UnknownIndex`] for undeclared names.
    pub fn ensure_index(&self, index_name: &str) -> Result<()> {
        self.index(index_name).map(|_| ())
    }

    // == Make Index Key ==
    /// `prefix + identity + ":i:" + index_name + ":" + index_value`
    pub fn make_index_key(&self, index_name: &str, index_value: &str) -> String {
        format!(
            "{prefix}{identity}{sep}{marker}{sep}{name}{sep}{value}",
            prefix = self.options.key_prefix,
            identity = self.identity,
            sep = KEY_SEPARATOR,
            marker = INDEX_MARKER,
            name = index_name,
            value = index_value,
        )
    }

    /// Every index key the record currently produces across all declared indexes.
    pub fn index_keys(&self, record: &E) -> Vec<String> {
        self.indexes
            .iter()
            .flat_map(|index| {
                index
                    .values(record)
                    .into_iter()
                    .map(move |value| self.make_index_key(index.name(), &value))
            })
            .collect()
    }

    // == Set Indexes ==
    /// Points every current index key of the record at its lookup value.
    pub async fn set_indexes(&self, record: &E) -> Result<()> {
        let keys = self.index_keys(record);
        if keys.is_empty() {
            return Ok(());
        }

        let lookup = self.lookup_value(record)?;
        for key in keys {
            self.backend
                .set(
                    &key,
                    lookup.as_str().as_bytes().to_vec(),
                    self.options.ttl(),
                    self.options.version,
                )
                .await?;
        }
        Ok(())
    }

    // == Resolve Index ==
    /// Lookup value an index entry points at, or None if no record claims it.
    pub async fn resolve_index(
        &self,
        index_name: &str,
        index_value: &str,
    ) -> Result<Option<LookupValue>> {
        self.ensure_index(index_name)?;

        let key = self.make_index_key(index_name, index_value);
        let Some(bytes) = self.backend.get(&key, self.options.version).await? else {
            debug!("Index miss: {}", key);
            return Ok(None);
        };

        let lookup = String::from_utf8(bytes).map_err(|e| {
            CacheError::Backend(format!("index entry {} is not valid UTF-8: {}", key, e))
        })?;
        Ok(Some(LookupValue::from(lookup)))
    }

    // == Get For Index ==
    /// Cached representation of the record an index value points at.
    ///
    /// Undeclared index names are a configuration error; an unclaimed index value
    /// or a dangling pointer is a plain miss.
    pub async fn get_for_index(
        &self,
        index_name: &str,
        index_value: &str,
        suffix: &str,
    ) -> Result<Option<Value>> {
        match self.resolve_index(index_name, index_value).await? {
            Some(lookup) => self.get(&lookup, suffix).await,
            None => Ok(None),
        }
    }

    /// Removes every index entry the record currently produces.
    pub(super) async fn delete_indexes(&self, record: &E) -> Result<usize> {
        let mut removed = 0;
        for key in self.index_keys(record) {
            if self.backend.delete(&key, self.options.version).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    // == Delete Index ==
    /// Removes a single index entry, e.g. one left orphaned by an earlier write.
    pub async fn delete_index(&self, index_name: &str, index_value: &str) -> Result<bool> {
        self.ensure_index(index_name)?;
        let key = self.make_index_key(index_name, index_value);
        self.backend.delete(&key, self.options.version).await
    }
}
