//! Record Cache - An indexed read-through cache for serialized records
//!
//! Serves serialized records from a key-value backend, falls back to a store of
//! truth on miss, keeps secondary indexes that resolve alternate attributes to a
//! record, and invalidates entries when records change.

pub mod backend;
pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod invalidation;
pub mod record;
pub mod retrieval;
pub mod tasks;

#[cfg(test)]
mod fixtures;

pub use backend::{Backend, BackendRegistry, MemoryBackend};
pub use cache::{CacheBuilder, IndexDefinition, RecordCache};
pub use config::{CacheOptions, MemoryBackendConfig};
pub use error::{CacheError, Result};
pub use invalidation::{
    ChangeFeed, ChangeKind, ChangeListener, ChangeNotification, InvalidationOutcome, Invalidator,
};
pub use record::{JsonSerializer, LookupValue, Record, RecordFilter, RecordSerializer, RecordStore};
pub use retrieval::{ReadOptions, Retriever};
pub use tasks::spawn_cleanup_task;
