//! Stored Entry Module
//!
//! A single value held by the in-memory backend, with its expiry and access stamp.

use std::time::Duration;

use tokio::time::Instant;

// == Stored Entry ==
/// Bytes stored under one namespaced key.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// The stored bytes
    pub value: Vec<u8>,
    /// When the entry stops being served, None = no expiration
    pub expires_at: Option<Instant>,
    /// Backend-wide access counter value at the last read or write
    pub last_access: u64,
}

impl StoredEntry {
    // == Constructor ==
    /// Creates an entry that expires `ttl` from now, or never when `ttl` is None.
    pub fn new(value: Vec<u8>, ttl: Option<Duration>, access: u64) -> Self {
        let now = Instant::now();
        Self {
            value,
            expires_at: ttl.map(|ttl| now + ttl),
            last_access: access,
        }
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches its expiry instant.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => Instant::now() >= expires,
            None => false,
        }
    }
}
