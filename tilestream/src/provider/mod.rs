//! Tile provider abstraction
//!
//! This module maps a (provider, style, tile coordinate, credentials) tuple
//! to a concrete fetchable URL across the supported third-party tile
//! services, including subdomain load balancing and per-provider style
//! tables.

mod types;
mod url;

pub use types::{MapStyle, ProviderConfig, ProviderError, TileProvider};
pub use url::resolve_url;
