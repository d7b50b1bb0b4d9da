//! Background Tasks Module
//!
//! Contains background tasks that run alongside the bundled in-memory backend.
//!
//! # Tasks
//! - Expiry sweep: purges expired backend entries at configured intervals

mod cleanup;

pub use cleanup::spawn_cleanup_task;
