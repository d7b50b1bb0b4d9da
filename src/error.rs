//! Error types for the record cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the record cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A cache or retriever definition failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The definition names a backend that was never registered
    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    /// An index lookup used a name the cache does not declare
    #[error("Unknown index: {0}")]
    UnknownIndex(String),

    /// A record has no value for the configured lookup field
    #[error("Record has no value for lookup field '{0}'")]
    MissingLookupField(String),

    /// The store of truth holds no record for the lookup value
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Key/value backend failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// Store-of-truth failure
    #[error("Store error: {0}")]
    Store(String),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// zlib compression or decompression failed
    #[error("Compression error: {0}")]
    Compression(String),
}

impl CacheError {
    /// Returns true for errors caused by a bad definition rather than by runtime state.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            CacheError::InvalidConfig(_)
                | CacheError::UnknownBackend(_)
                | CacheError::UnknownIndex(_)
                | CacheError::MissingLookupField(_)
        )
    }
}

// == Result Type Alias ==
/// Convenience Result type for the record cache.
pub type Result<T> = std::result::Result<T, CacheError>;
