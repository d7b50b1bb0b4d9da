//! Invalidation Module
//!
//! Keeps a cache in step with the store of truth. Creates, updates and watched
//! association changes rewrite the record's entry and indexes; deletes remove
//! them. Handling is synchronous with the notification and never retried: a
//! failed write leaves the entry stale until the next write or forced refresh.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::RecordCache;
use crate::error::{CacheError, Result};
use crate::record::Record;

// == Change Notification ==
/// What happened to a record in the store of truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
    /// A many-to-many association of the record changed
    AssociationChanged(String),
}

/// A change to one record, carrying the record's state after the change
/// (or its last state, for deletes).
#[derive(Debug, Clone)]
pub struct ChangeNotification<E> {
    pub kind: ChangeKind,
    pub record: E,
}

impl<E> ChangeNotification<E> {
    pub fn created(record: E) -> Self {
        Self {
            kind: ChangeKind::Created,
            record,
        }
    }

    pub fn updated(record: E) -> Self {
        Self {
            kind: ChangeKind::Updated,
            record,
        }
    }

    pub fn deleted(record: E) -> Self {
        Self {
            kind: ChangeKind::Deleted,
            record,
        }
    }

    pub fn association_changed(association: impl Into<String>, record: E) -> Self {
        Self {
            kind: ChangeKind::AssociationChanged(association.into()),
            record,
        }
    }
}

/// Effect a notification had on the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationOutcome {
    /// The record was re-serialized and rewritten
    Refreshed,
    /// The record's entries were removed; holds the primary entry count
    Removed(usize),
    /// The notification concerns an association this cache does not watch
    Ignored,
}

// == Invalidator ==
/// Applies change notifications for one record type to one cache.
pub struct Invalidator<E> {
    cache: Arc<RecordCache<E>>,
    associations: HashSet<String>,
}

impl<E: Record> Invalidator<E> {
    pub fn new(cache: Arc<RecordCache<E>>) -> Self {
        Self {
            cache,
            associations: HashSet::new(),
        }
    }

    /// Also refresh the record when the named association changes.
    pub fn watch_association(mut self, association: impl Into<String>) -> Result<Self> {
        let association = association.into();
        if association.is_empty() {
            return Err(CacheError::InvalidConfig(
                "association name cannot be empty".to_string(),
            ));
        }
        self.associations.insert(association);
        Ok(self)
    }

    pub fn watches(&self, association: &str) -> bool {
        self.associations.contains(association)
    }

    /// Rewrites the record's default entry and its indexes.
    pub async fn on_change(&self, record: &E) -> Result<Value> {
        self.cache.set(record, "").await
    }

    /// Removes every cached variant of the record and its indexes.
    pub async fn on_delete(&self, record: &E) -> Result<usize> {
        self.cache.delete(record, "").await
    }

    // == Handle ==
    /// Applies a notification, propagating cache failures.
    pub async fn handle(&self, notification: &ChangeNotification<E>) -> Result<InvalidationOutcome> {
        match &notification.kind {
            ChangeKind::Created | ChangeKind::Updated => {
                self.on_change(&notification.record).await?;
                Ok(InvalidationOutcome::Refreshed)
            }
            ChangeKind::AssociationChanged(association) if self.watches(association) => {
                self.on_change(&notification.record).await?;
                Ok(InvalidationOutcome::Refreshed)
            }
            ChangeKind::AssociationChanged(association) => {
                debug!(
                    "{} ignores changes to unwatched association {}",
                    self.cache.identity(),
                    association
                );
                Ok(InvalidationOutcome::Ignored)
            }
            ChangeKind::Deleted => {
                let removed = self.on_delete(&notification.record).await?;
                Ok(InvalidationOutcome::Removed(removed))
            }
        }
    }
}

impl<E> fmt::Debug for Invalidator<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invalidator")
            .field("cache", &self.cache)
            .field("associations", &self.associations)
            .finish()
    }
}

// == Change Listener ==
/// Receives change notifications for one record type.
#[async_trait]
pub trait ChangeListener<E>: Send + Sync {
    /// Reacts to a notification. Failures stay with the listener; the store
    /// mutation that produced the notification is never affected.
    async fn notify(&self, notification: &ChangeNotification<E>);
}

#[async_trait]
impl<E: Record> ChangeListener<E> for Invalidator<E> {
    async fn notify(&self, notification: &ChangeNotification<E>) {
        if let Err(err) = self.handle(notification).await {
            warn!(
                "Cache {} left stale after {:?} notification: {}",
                self.cache.identity(),
                notification.kind,
                err
            );
        }
    }
}

// == Change Feed ==
/// Fan-out of one record type's notifications to every subscribed listener.
pub struct ChangeFeed<E> {
    listeners: Vec<Arc<dyn ChangeListener<E>>>,
}

impl<E: Record> ChangeFeed<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Arc<dyn ChangeListener<E>>) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Delivers the notification to each listener in subscription order and
    /// waits for all of them.
    pub async fn publish(&self, notification: &ChangeNotification<E>) {
        for listener in &self.listeners {
            listener.notify(notification).await;
        }
    }
}

impl<E: Record> Default for ChangeFeed<E> {
    fn default() -> Self {
        Self::new()
    }
}
