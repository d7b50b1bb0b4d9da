//! Backend Statistics Module
//!
//! Counters kept by the in-memory backend.

use serde::Serialize;

// == Backend Stats ==
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackendStats {
    /// Reads that returned a live value
    pub hits: u64,
    /// Reads that found nothing or an expired value
    pub misses: u64,
    /// Entries dropped to stay within capacity
    pub evictions: u64,
    /// Entries dropped because their lifetime elapsed
    pub expirations: u64,
    /// Entries currently held, across all versions
    pub total_entries: usize,
}

impl BackendStats {
    /// Fraction of reads that hit, or 0.0 before any read.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
