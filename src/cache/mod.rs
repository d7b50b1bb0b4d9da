//! Cache Module
//!
//! Serialized-record caching keyed by a primary lookup value, with optional
//! secondary indexes resolving alternate keys to that lookup value.

mod definition;
mod indexes;
mod primary;


// Re-export public types
pub use definition::{CacheBuilder, IndexDefinition};
pub use primary::RecordCache;

// == Public Constants ==
/// Separator placed between the identity and the rest of every key
pub const KEY_SEPARATOR: char = ':';

/// Marker segment distinguishing index keys from primary keys
pub const INDEX_MARKER: &str = "i";
