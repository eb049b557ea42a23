//! Coordinate types shared across the crate.

use std::fmt;
use thiserror::Error;

/// Minimum latitude representable in the Web Mercator projection.
pub const MIN_LAT: f64 = -85.05112878;

/// Maximum latitude representable in the Web Mercator projection.
pub const MAX_LAT: f64 = 85.05112878;

/// Minimum longitude in degrees.
pub const MIN_LON: f64 = -180.0;

/// Maximum longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Minimum supported zoom level.
pub const MIN_ZOOM: u8 = 0;

/// Maximum supported zoom level.
///
/// Zoom 22 is the deepest level offered by any of the supported tile
/// providers; most stop at 19.
pub const MAX_ZOOM: u8 = 22;

/// Errors produced by coordinate validation and conversion.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoordError {
    /// Latitude outside [-90, 90] or not finite.
    #[error("invalid latitude: {0}")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180] or not finite.
    #[error("invalid longitude: {0}")]
    InvalidLongitude(f64),

    /// Zoom level above the supported maximum.
    #[error("invalid zoom level: {0} (max {MAX_ZOOM})")]
    InvalidZoom(u8),

    /// Tile index outside the `2^zoom` grid.
    #[error("tile ({x}, {y}) out of range at zoom {zoom}")]
    TileOutOfRange { x: u32, y: u32, zoom: u8 },
}

/// A tile address in the Web Mercator slippy-map grid.
///
/// `x` grows eastward and `y` grows southward; both are in
/// `[0, 2^zoom - 1]`, enforced at construction. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    x: u32,
    y: u32,
    zoom: u8,
}

impl TileCoord {
    /// Creates a validated tile coordinate.
    pub fn new(x: u32, y: u32, zoom: u8) -> Result<Self, CoordError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom));
        }
        let n = 1u32 << zoom;
        if x >= n || y >= n {
            return Err(CoordError::TileOutOfRange { x, y, zoom });
        }
        Ok(Self { x, y, zoom })
    }

    /// Tile column (west to east).
    pub fn x(&self) -> u32 {
        self.x
    }

    /// Tile row (north to south).
    pub fn y(&self) -> u32 {
        self.y
    }

    /// Zoom level.
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Number of tiles along one axis at this coordinate's zoom level.
    pub fn tiles_per_axis(&self) -> u32 {
        1u32 << self.zoom
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// A geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCoord {
    /// Latitude in degrees, [-90, 90].
    pub lat: f64,
    /// Longitude in degrees, [-180, 180].
    pub lon: f64,
}

impl GeoCoord {
    /// Creates a geographic coordinate without validation.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for GeoCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// A rectangle in geographic space.
///
/// `north >= south` is the caller's responsibility and is not enforced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl GeoBounds {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Northwest corner of the rectangle.
    pub fn north_west(&self) -> GeoCoord {
        GeoCoord::new(self.north, self.west)
    }

    /// Southeast corner of the rectangle.
    pub fn south_east(&self) -> GeoCoord {
        GeoCoord::new(self.south, self.east)
    }

    /// Center point of the rectangle.
    pub fn center(&self) -> GeoCoord {
        GeoCoord::new(
            (self.north + self.south) / 2.0,
            (self.east + self.west) / 2.0,
        )
    }
}
