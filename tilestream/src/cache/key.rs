//! Cache key derivation.

use std::fmt;

use crate::coord::TileCoord;
use crate::provider::{MapStyle, TileProvider};

/// Identity of a cached tile.
///
/// Derived deterministically from `(provider, style, zoom, x, y)`: the same
/// geographic tile under a different provider or style is a distinct entry,
/// since tiles from different services are not interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    provider: TileProvider,
    style: MapStyle,
    zoom: u8,
    x: u32,
    y: u32,
}

impl TileKey {
    /// Creates a key for a tile under the given provider and style.
    pub fn new(provider: TileProvider, style: MapStyle, coord: &TileCoord) -> Self {
        Self {
            provider,
            style,
            zoom: coord.zoom(),
            x: coord.x(),
            y: coord.y(),
        }
    }

    pub fn provider(&self) -> TileProvider {
        self.provider
    }

    pub fn style(&self) -> MapStyle {
        self.style
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.provider.name(),
            self.style.name(),
            self.zoom,
            self.x,
            self.y
        )
    }
}
