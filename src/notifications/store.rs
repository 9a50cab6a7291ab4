// SPDX-License-Identifier: MPL-2.0
//! Ordered storage of the currently active notifications.
//!
//! The store is the only place records are added or removed. Every mutation
//! that changes the active set is immediately followed by a synchronous
//! broadcast of the new ordered snapshot. The `watch` channel is updated
//! first, so a callback reading it sees the snapshot it was handed.

use super::id::NotificationId;
use super::notification::Notification;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use tokio::sync::watch;

/// Callback invoked with the ordered snapshot after every change.
pub type SubscriberFn = Box<dyn Fn(&[Notification]) + Send + 'static>;

/// Insertion-ordered set of active notifications plus its subscribers.
pub struct Store {
    records: IndexMap<NotificationId, Notification>,
    /// Logical clock stamped on inserted records.
    next_tick: u64,
    subscribers: Vec<(u64, SubscriberFn)>,
    watch_tx: watch::Sender<Vec<Notification>>,
}

impl Store {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (watch_tx, _) = watch::channel(Vec::new());
        Self {
            records: IndexMap::new(),
            next_tick: 0,
            subscribers: Vec::new(),
            watch_tx,
        }
    }

    /// Appends a record at the end of the display order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateId`] if a record with the same id is
    /// already active. The store is left unchanged in that case.
    pub fn insert(&mut self, mut record: Notification) -> Result<()> {
        let id = record.id();
        if self.records.contains_key(&id) {
            return Err(Error::DuplicateId(id));
        }
        record.stamp(self.next_tick);
        self.next_tick += 1;
        self.records.insert(id, record);
        self.emit();
        Ok(())
    }

    /// Removes a record if present and returns it marked as retired.
    ///
    /// Retiring an unknown id is a no-op and does not notify subscribers.
    pub fn retire(&mut self, id: NotificationId) -> Option<Notification> {
        let removed = self.records.shift_remove(&id)?;
        self.emit();
        Some(removed.retire())
    }

    /// Removes every record matching `predicate`, keeping the order of the
    /// rest. Subscribers are notified once if anything was removed.
    pub fn retire_where<F>(&mut self, mut predicate: F) -> Vec<Notification>
    where
        F: FnMut(&Notification) -> bool,
    {
        let (retired, kept): (IndexMap<_, _>, IndexMap<_, _>) = std::mem::take(&mut self.records)
            .into_iter()
            .partition(|(_, record)| predicate(record));
        self.records = kept;
        if !retired.is_empty() {
            self.emit();
        }
        retired.into_values().map(Notification::retire).collect()
    }

    /// Removes all records and returns how many there were.
    ///
    /// Subscribers are always notified, even if the store was already empty.
    pub fn clear(&mut self) -> usize {
        let removed = self.records.len();
        self.records.clear();
        self.emit();
        removed
    }

    /// Returns the active records in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Notification> {
        self.records.values().cloned().collect()
    }

    /// Registers a callback under `key`, which the caller keeps unique.
    pub fn subscribe(&mut self, key: u64, callback: SubscriberFn) {
        self.subscribers.push((key, callback));
    }

    /// Unregisters a callback. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, key: u64) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(k, _)| *k != key);
        self.subscribers.len() != before
    }

    /// Returns a receiver that always holds the latest snapshot.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Vec<Notification>> {
        self.watch_tx.subscribe()
    }

    fn emit(&self) {
        let snapshot = self.snapshot();
        self.watch_tx.send_replace(snapshot.clone());
        for (_, callback) in &self.subscribers {
            callback(&snapshot);
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("records", &self.records)
            .field("subscribers", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}
