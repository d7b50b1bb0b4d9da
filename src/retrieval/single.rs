//! Single-record read-through.

use serde_json::Value;

use super::{ReadOptions, Retriever};
use crate::error::{CacheError, Result};
use crate::record::{LookupValue, Record};

impl<E: Record> Retriever<E> {
    // == Retrieve ==
    /// Serialized record for `lookup`, from cache when possible.
    ///
    /// When the retriever is indexed the cache is consulted through its index;
    /// the store is always queried by the lookup field. Fails with
    /// [`CacheError::NotFound`] when the store has no such record.
    pub async fn retrieve(
        &self,
        lookup: impl Into<LookupValue>,
        options: &ReadOptions,
    ) -> Result<Value> {
        let lookup = lookup.into();
        let suffix = options.key_suffix.as_str();

        let cached = if options.force_refresh {
            None
        } else {
            match &self.cache_index {
                Some(index_name) => {
                    self.cache
                        .get_for_index(index_name, lookup.as_str(), suffix)
                        .await?
                }
                None => self.cache.get(&lookup, suffix).await?,
            }
        };

        let data = match cached {
            Some(data) => data,
            None => {
                let record = self
                    .store
                    .find(&self.lookup_field, &lookup)
                    .await?
                    .ok_or_else(|| CacheError::NotFound(lookup.to_string()))?;
                self.cache_record(&record, suffix).await?
            }
        };

        Ok(self.finish(data))
    }

    // == Retrieve By Index ==
    /// Serialized record that the `index_name` index maps `index_value` to, or
    /// None if no record in the store produces that value.
    ///
    /// Misses and forced refreshes load through
    /// [`crate::record::RecordStore::find_by_index`], so the index need not
    /// correspond to a record attribute.
    pub async fn retrieve_by_index(
        &self,
        index_name: &str,
        index_value: &str,
        options: &ReadOptions,
    ) -> Result<Option<Value>> {
        let index = self.cache.index(index_name)?;
        let suffix = options.key_suffix.as_str();

        if !options.force_refresh {
            if let Some(data) = self
                .cache
                .get_for_index(index_name, index_value, suffix)
                .await?
            {
                return Ok(Some(self.finish(data)));
            }
        }

        let Some(record) = self.store.find_by_index(index, index_value).await? else {
            return Ok(None);
        };
        let data = self.cache_record(&record, suffix).await?;
        Ok(Some(self.finish(data)))
    }
}
