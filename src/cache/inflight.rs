//! In-flight table: one pending load per key (single-flight).
//!
//! Each pending load owns a `watch` channel as its completion cell. The
//! load task holds the sender and publishes the result exactly once;
//! every waiter holds a cloned receiver. Cancellation removes the table
//! entry but leaves the channel alive, so clients that were already
//! waiting still receive the eventual result.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::watch;

use crate::Key;

/// Monotonic identifier distinguishing successive loads of the same key.
/// A completion whose ticket no longer matches the table entry is stale.
pub type LoadTicket = u64;

/// Why a load was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    /// Synchronous load on behalf of a blocked client. Not cancellable.
    Client,
    /// Speculative background load. Cancellable, counted against the
    /// prefetch cap.
    Prefetch,
}

/// Shared completion cell contents.
pub enum LoadState<V> {
    Pending,
    Ready(Arc<V>),
    Failed(Arc<anyhow::Error>),
}

impl<V> Clone for LoadState<V> {
    fn clone(&self) -> Self {
        match self {
            LoadState::Pending => LoadState::Pending,
            LoadState::Ready(v) => LoadState::Ready(v.clone()),
            LoadState::Failed(e) => LoadState::Failed(e.clone()),
        }
    }
}

/// A load that has been issued but not yet committed or cancelled.
///
/// Cancellation is tracked by entry presence alone: a cancelled or
/// superseded load simply no longer matches on `(key, ticket)`.
pub struct PendingLoad<V> {
    pub ticket: LoadTicket,
    pub kind: LoadKind,
    waiter: watch::Receiver<LoadState<V>>,
}

/// Outcome of [`InFlightTable::begin`].
pub enum Begin<V> {
    /// No load was pending; the caller must run it and publish the result.
    New {
        ticket: LoadTicket,
        publisher: watch::Sender<LoadState<V>>,
    },
    /// A load is already pending; the caller joins it.
    Joined { waiter: watch::Receiver<LoadState<V>> },
}

/// Mapping of key → pending load handle.
pub struct InFlightTable<V> {
    pending: HashMap<Key, PendingLoad<V>>,
    next_ticket: LoadTicket,
}

impl<V> InFlightTable<V> {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
            next_ticket: 0,
        }
    }

    /// Register a load for `key`, or join the one already pending.
    pub fn begin(&mut self, key: Key, kind: LoadKind) -> Begin<V> {
        if let Some(pending) = self.pending.get(&key) {
            return Begin::Joined {
                waiter: pending.waiter.clone(),
            };
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;

        let (publisher, waiter) = watch::channel(LoadState::Pending);
        self.pending.insert(
            key,
            PendingLoad {
                ticket,
                kind,
                waiter,
            },
        );

        Begin::New { ticket, publisher }
    }

    /// Whether `ticket` still identifies the current load for `key`.
    pub fn is_current(&self, key: Key, ticket: LoadTicket) -> bool {
        self.pending
            .get(&key)
            .map(|p| p.ticket == ticket)
            .unwrap_or(false)
    }

    /// Remove the pending entry for `key` if `ticket` is still current.
    /// Used on completion (commit or failure) by whoever ran the load.
    pub fn finish(&mut self, key: Key, ticket: LoadTicket) -> Option<PendingLoad<V>> {
        if !self.is_current(key, ticket) {
            return None;
        }
        self.pending.remove(&key)
    }

    /// Cooperatively cancel the pending prefetch for `key` by dropping
    /// the table's reference; the load keeps running and its completion
    /// arrives stale. Returns false for absent entries and for client
    /// loads, which are never cancelled.
    pub fn cancel(&mut self, key: Key) -> bool {
        let is_prefetch = self
            .pending
            .get(&key)
            .map(|p| p.kind == LoadKind::Prefetch)
            .unwrap_or(false);
        if !is_prefetch {
            return false;
        }
        self.pending.remove(&key).is_some()
    }

    pub fn contains(&self, key: Key) -> bool {
        self.pending.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Keys of pending prefetch-kind loads (the scheduler's view).
    pub fn prefetch_keys(&self) -> HashSet<Key> {
        self.pending
            .iter()
            .filter(|(_, p)| p.kind == LoadKind::Prefetch)
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn prefetch_count(&self) -> usize {
        self.pending
            .values()
            .filter(|p| p.kind == LoadKind::Prefetch)
            .count()
    }

    /// Drop every pending load. Returns how many prefetch entries were
    /// outstanding.
    pub fn drain(&mut self) -> usize {
        let prefetches = self.prefetch_count();
        self.pending.clear();
        prefetches
    }
}
