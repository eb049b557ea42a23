//! In-memory tile cache with FIFO eviction and lazy expiry.
//!
//! Eviction removes the oldest-inserted entry first, deliberately NOT the
//! least-recently-used one: eviction order is observable behavior callers
//! rely on, so a recency policy would be a breaking change. Expiry is
//! checked lazily on `get`; there is no background sweep, so an expired
//! entry that is never looked up holds its slot until capacity pressure
//! pushes it out.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use super::key::TileKey;
use super::tile::CachedTile;

/// Cache statistics snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently resident.
    pub count: usize,
    /// Lookups that returned a live entry.
    pub hits: u64,
    /// Lookups that found nothing (or only an expired entry).
    pub misses: u64,
    /// Resident entries in the failed state.
    pub failed: usize,
}

struct CacheInner {
    entries: HashMap<TileKey, CachedTile>,
    /// Insertion order; drives FIFO eviction. May contain keys whose entry
    /// was already removed by lazy expiry, which eviction skips over.
    order: VecDeque<TileKey>,
}

/// Bounded tile store.
///
/// Thread-safe behind a single mutex; lookups and insertions are cheap
/// map operations, so contention stays low even with many concurrent
/// fetch completions.
pub struct TileCache {
    inner: Mutex<CacheInner>,
    max_tiles: usize,
    expiry: Option<Duration>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TileCache {
    /// Creates a cache bounded to `max_tiles` entries.
    ///
    /// `expiry` of `None` disables age-based expiry.
    pub fn new(max_tiles: usize, expiry: Option<Duration>) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            max_tiles: max_tiles.max(1),
            expiry,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Looks up a tile.
    ///
    /// Returns `None` if the key is absent or the entry has aged past the
    /// expiry window; expired entries are removed as a side effect so the
    /// next fetch starts from scratch.
    pub fn get(&self, key: &TileKey) -> Option<CachedTile> {
        let mut inner = self.inner.lock();

        match inner.entries.get(key) {
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Some(tile) => {
                let expired = self.expiry.is_some_and(|expiry| tile.is_expired(expiry));
                if !expired {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(tile.clone());
                }
            }
        }

        // Entry exists but has aged out; drop it so the next fetch starts
        // from scratch. Its key stays in the order queue and is skipped
        // during eviction.
        inner.entries.remove(key);
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Inserts or replaces a tile.
    ///
    /// Replacing an existing key keeps its original insertion position.
    /// Inserting a new key at capacity evicts the oldest-inserted entry
    /// still present.
    pub fn put(&self, key: TileKey, tile: CachedTile) {
        let mut inner = self.inner.lock();

        if inner.entries.insert(key, tile).is_some() {
            return;
        }
        inner.order.push_back(key);

        while inner.entries.len() > self.max_tiles {
            match inner.order.pop_front() {
                // Skip keys whose entry was already dropped by expiry
                Some(oldest) => {
                    if inner.entries.remove(&oldest).is_some() {
                        tracing::trace!(key = %oldest, "evicted oldest tile");
                    }
                }
                None => break,
            }
        }
    }

    /// Whether a live (unexpired) entry exists, without touching the
    /// hit/miss counters.
    pub fn contains(&self, key: &TileKey) -> bool {
        let inner = self.inner.lock();
        match inner.entries.get(key) {
            Some(tile) => match self.expiry {
                Some(expiry) => !tile.is_expired(expiry),
                None => true,
            },
            None => false,
        }
    }

    /// Removes every entry. Hit/miss counters keep running.
    pub fn invalidate(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Statistics snapshot.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            count: inner.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            failed: inner.entries.values().filter(|t| t.failed).count(),
        }
    }
}
