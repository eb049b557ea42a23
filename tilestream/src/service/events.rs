//! Tile completion notifications.
//!
//! Two delivery paths with different guarantees:
//!
//! - **Waiters** — one-shot callbacks registered against a specific key,
//!   invoked exactly once when that key's fetch completes (or immediately
//!   when the tile is already cached). The registration check and the
//!   cache lookup happen under one lock so a completion can never slip
//!   between "saw a miss" and "stored the callback".
//! - **Broadcast** — a best-effort `TileEvent` stream for observers that
//!   watch all completions (renderers, progress bars). Slow subscribers
//!   may lag and drop events; waiters never do.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::trace;

use crate::cache::{CachedTile, FetchFailure, TileKey};

/// Broadcast notification for a completed fetch.
#[derive(Debug, Clone)]
pub enum TileEvent {
    /// The tile was fetched and decoded.
    Loaded { key: TileKey },
    /// The fetch reached a terminal failure.
    Failed { key: TileKey, failure: FetchFailure },
}

impl TileEvent {
    /// The key the event concerns.
    pub fn key(&self) -> TileKey {
        match self {
            TileEvent::Loaded { key } => *key,
            TileEvent::Failed { key, .. } => *key,
        }
    }
}

/// One-shot completion callback.
pub type TileCallback = Box<dyn FnOnce(&CachedTile) + Send + 'static>;

/// Callback registry and event fan-out for tile completions.
pub struct TileEvents {
    waiters: Mutex<HashMap<TileKey, Vec<TileCallback>>>,
    broadcast: broadcast::Sender<TileEvent>,
}

impl TileEvents {
    /// Creates the registry with the given broadcast buffer capacity.
    pub fn new(broadcast_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(broadcast_capacity.max(1));
        Self {
            waiters: Mutex::new(HashMap::new()),
            broadcast: tx,
        }
    }

    /// Subscribes to all completion events.
    pub fn subscribe(&self) -> broadcast::Receiver<TileEvent> {
        self.broadcast.subscribe()
    }

    /// Registers `callback` for `key`, unless `lookup` yields a tile, in
    /// which case the callback runs synchronously instead.
    ///
    /// `lookup` executes under the waiter lock; together with
    /// [`TileEvents::complete`] inserting into the cache before draining,
    /// this guarantees the callback fires exactly once: either here (hit)
    /// or on completion (registered), never both and never zero times for
    /// a fetch that completes.
    ///
    /// Returns `true` if the callback was registered (the caller should
    /// make sure a fetch is running for the key).
    pub fn register_waiter<F>(&self, key: TileKey, callback: TileCallback, lookup: F) -> bool
    where
        F: FnOnce() -> Option<CachedTile>,
    {
        let mut waiters = self.waiters.lock();
        if let Some(tile) = lookup() {
            drop(waiters);
            callback(&tile);
            return false;
        }
        waiters.entry(key).or_default().push(callback);
        true
    }

    /// Delivers a completed tile: drains the key's waiters (invoking each
    /// exactly once, outside the lock) and broadcasts a [`TileEvent`].
    ///
    /// Callers must insert the tile into the cache BEFORE calling this,
    /// or a concurrent `register_waiter` could miss both the cache entry
    /// and the drain.
    pub fn complete(&self, key: TileKey, tile: &CachedTile) {
        let drained = self.waiters.lock().remove(&key).unwrap_or_default();
        trace!(key = %key, waiters = drained.len(), failed = tile.failed, "tile completed");

        for callback in drained {
            callback(tile);
        }

        let event = match (&tile.failure, tile.failed) {
            (Some(failure), true) => TileEvent::Failed {
                key,
                failure: failure.clone(),
            },
            _ => TileEvent::Loaded { key },
        };
        // No subscribers is fine
        let _ = self.broadcast.send(event);
    }

    /// Drops any waiters for `key` without invoking them.
    ///
    /// Used when a completion is discarded as stale: the key belongs to a
    /// provider/style generation that no longer exists, and so do its
    /// waiters.
    pub fn discard(&self, key: TileKey) {
        if let Some(dropped) = self.waiters.lock().remove(&key) {
            trace!(key = %key, waiters = dropped.len(), "dropped waiters for stale key");
        }
    }

    /// Number of callbacks waiting on `key`.
    #[cfg(test)]
    pub fn waiter_count(&self, key: &TileKey) -> usize {
        self.waiters.lock().get(key).map_or(0, Vec::len)
    }
}
