//! Offline tile storage interface.
//!
//! The contract a durable tile archive would fulfill. No implementation
//! exists yet; [`crate::service::TileService::download_area_for_offline`]
//! reports the store as unavailable until one does.

use thiserror::Error;

use crate::cache::TileKey;
use crate::fetch::BoxFuture;

/// Errors from a durable tile store.
#[derive(Debug, Error)]
pub enum OfflineStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store failure: {0}")]
    Store(String),
}

/// Progress callback: `(tiles_done, tiles_total)`.
pub type OfflineProgress = Box<dyn Fn(usize, usize) + Send + Sync + 'static>;

/// Durable storage for downloaded tiles.
///
/// Implementations persist encoded tile payloads (the raw PNG/JPEG bytes,
/// not the decoded raster) so an offline session can be served without
/// network access.
pub trait OfflineTileStore: Send + Sync {
    /// Persists the encoded payload for a tile.
    fn store_tile<'a>(
        &'a self,
        key: &'a TileKey,
        encoded: &'a [u8],
    ) -> BoxFuture<'a, Result<(), OfflineStoreError>>;

    /// Whether a tile is already persisted.
    fn contains<'a>(&'a self, key: &'a TileKey) -> BoxFuture<'a, bool>;
}
