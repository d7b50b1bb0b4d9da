//! Order-preserving batch read-through.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use super::{ReadOptions, Retriever};
use crate::error::Result;
use crate::record::{LookupValue, Record};

impl<E: Record> Retriever<E> {
    // == Retrieve Batch ==
    /// Serialized records for an ordered page of lookup values.
    ///
    /// Hits are served from the cache; all misses are loaded with one store query
    /// and matched back to their positions by lookup value, so the store may
    /// answer in any order. A lookup value the store no longer has is omitted
    /// from the result; every other record keeps its requested position.
    pub async fn retrieve_batch(
        &self,
        lookups: &[LookupValue],
        options: &ReadOptions,
    ) -> Result<Vec<Value>> {
        let suffix = options.key_suffix.as_str();
        let mut slots: Vec<Option<Value>> = Vec::with_capacity(lookups.len());
        let mut misses: Vec<(usize, &LookupValue)> = Vec::new();

        for (position, lookup) in lookups.iter().enumerate() {
            let cached = if options.force_refresh {
                None
            } else {
                self.cache.get(lookup, suffix).await?
            };

            match cached {
                Some(data) => slots.push(Some(self.finish(data))),
                None => {
                    misses.push((position, lookup));
                    slots.push(None);
                }
            }
        }

        if misses.is_empty() {
            return Ok(slots.into_iter().flatten().collect());
        }

        let wanted: Vec<LookupValue> = misses.iter().map(|(_, lookup)| (*lookup).clone()).collect();
        let records = self.store.find_many(&self.lookup_field, &wanted).await?;

        let mut loaded: HashMap<LookupValue, E> = HashMap::with_capacity(records.len());
        for record in records {
            loaded.insert(self.cache.lookup_value(&record)?, record);
        }

        let mut dropped = 0;
        for (position, lookup) in misses {
            match loaded.get(lookup) {
                Some(record) => {
                    let data = self.cache_record(record, suffix).await?;
                    slots[position] = Some(self.finish(data));
                }
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            debug!(
                "Omitted {} of {} batch entries with no backing record",
                dropped,
                lookups.len()
            );
        }

        Ok(slots.into_iter().flatten().collect())
    }
}
