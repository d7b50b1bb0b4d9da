//! Record Module
//!
//! Contracts for the store of truth behind the cache: how a record exposes its
//! attributes, how it is serialized, and how it is queried.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::IndexDefinition;
use crate::error::Result;

// == Lookup Value ==
/// A record attribute rendered as text, used in cache keys and store queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LookupValue(String);

impl LookupValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LookupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for LookupValue {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for LookupValue {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

macro_rules! lookup_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for LookupValue {
                fn from(value: $ty) -> Self {
                    Self(value.to_string())
                }
            }
        )*
    };
}

lookup_from_integer!(i32, i64, u32, u64, usize);

// == Record ==
/// A domain record held by the store of truth.
pub trait Record: Send + Sync + 'static {
    /// Value of the named attribute, or None if the record has no such attribute.
    fn attribute(&self, field: &str) -> Option<LookupValue>;
}

// == Serializer ==
/// Produces the representation that is cached and returned to callers.
pub trait RecordSerializer<E>: Send + Sync {
    fn serialize(&self, record: &E) -> Result<Value>;
}

/// Serializes any `serde::Serialize` record with `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl<E: Serialize> RecordSerializer<E> for JsonSerializer {
    fn serialize(&self, record: &E) -> Result<Value> {
        Ok(serde_json::to_value(record)?)
    }
}

impl<E, F> RecordSerializer<E> for F
where
    F: Fn(&E) -> Result<Value> + Send + Sync,
{
    fn serialize(&self, record: &E) -> Result<Value> {
        self(record)
    }
}

// == Record Filter ==
/// Conjunction of attribute equality conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    conditions: Vec<(String, LookupValue)>,
}

impl RecordFilter {
    /// Matches every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// Adds the condition `field == value`.
    pub fn field_eq(mut self, field: impl Into<String>, value: impl Into<LookupValue>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, LookupValue)] {
        &self.conditions
    }

    pub fn matches<E: Record>(&self, record: &E) -> bool {
        self.conditions
            .iter()
            .all(|(field, value)| record.attribute(field).as_ref() == Some(value))
    }
}

// == Record Store ==
/// Query side of the store of truth.
#[async_trait]
pub trait RecordStore<E>: Send + Sync {
    /// Loads the record whose `field` equals `value`.
    async fn find(&self, field: &str, value: &LookupValue) -> Result<Option<E>>;

    /// Loads every record whose `field` is one of `values`, in no particular order.
    /// Values without a record are skipped.
    async fn find_many(&self, field: &str, values: &[LookupValue]) -> Result<Vec<E>>;

    /// Loads every record matching `filter`.
    async fn filter(&self, filter: &RecordFilter) -> Result<Vec<E>>;

    /// Loads a record for which `index` produces `value`.
    ///
    /// Index values come from the index extractor and need not match any record
    /// attribute, so the default scans every record through [`Self::filter`].
    /// Stores able to answer the query directly should override it.
    async fn find_by_index(&self, index: &IndexDefinition<E>, value: &str) -> Result<Option<E>>
    where
        E: Send + 'static,
    {
        let everything = RecordFilter::all();
        let candidates = self.filter(&everything).await?;
        Ok(candidates
            .into_iter()
            .find(|record| index.values(record).iter().any(|v| v == value)))
    }
}
