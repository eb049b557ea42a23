//! Tilestream - map tile acquisition and caching
//!
//! This library converts geographic coordinates into Web Mercator slippy-map
//! tile addresses, resolves them into provider-specific URLs, fetches tiles
//! over HTTP with bounded concurrency, request deduplication and retry, and
//! maintains a size- and time-bounded in-memory cache.
//!
//! The entry point is [`service::TileService`]:
//!
//! ```ignore
//! use tilestream::coord::tile_for_coord;
//! use tilestream::service::{TileService, TileServiceConfig};
//!
//! let service = TileService::new(TileServiceConfig::default())?;
//! let tile = tile_for_coord(38.9012, -77.2653, 15)?;
//!
//! // Non-blocking: None means "fetching, ask again later"
//! if let Some(image) = service.get_tile(&tile) {
//!     // hand the decoded raster to the renderer
//! }
//! ```

pub mod cache;
pub mod config;
pub mod coord;
pub mod fetch;
pub mod provider;
pub mod service;
