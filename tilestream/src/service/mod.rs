//! Tile service facade
//!
//! The public contract composing cache, fetch coordination and
//! notifications: synchronous cache-or-trigger lookup, callback-based
//! async lookup, area preloading, provider/style switching (which
//! invalidates the cache) and statistics.

mod config;
mod events;
mod offline;
mod tile_service;

pub use config::{TileServiceConfig, DEFAULT_CACHE_EXPIRY, DEFAULT_CACHE_MAX_TILES, DEFAULT_USER_AGENT};
pub use events::{TileCallback, TileEvent, TileEvents};
pub use offline::{OfflineProgress, OfflineStoreError, OfflineTileStore};
pub use tile_service::{ServiceError, TileService};
