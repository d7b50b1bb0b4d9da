//! Expiry Sweep Task
//!
//! Background task that periodically purges expired entries from the bundled
//! in-memory backend. Expired entries are already invisible to reads; the sweep
//! only reclaims their memory.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::backend::MemoryBackend;

/// Spawns a background task that purges expired backend entries.
///
/// The task runs in an infinite loop, sleeping for `cleanup_interval_secs`
/// between sweeps. An interval of 0 is treated as 1 second.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let backend = Arc::new(MemoryBackend::from_config(&config));
/// let cleanup_handle = spawn_cleanup_task(backend.clone(), config.cleanup_interval);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(backend: Arc<MemoryBackend>, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting expiry sweep with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = backend.purge_expired().await;
            if removed > 0 {
                info!("Expiry sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    })
}
