//! Cached tile entry and decoded image buffer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use thiserror::Error;

use crate::coord::TileCoord;

/// Terminal failure reason attached to a tile whose fetch did not succeed.
///
/// The distinction that matters to callers is retryable vs. not:
/// configuration failures will never succeed until the service is
/// reconfigured, while the rest may clear up on their own.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FetchFailure {
    /// Connection-level failure (DNS, TLS, reset, ...).
    #[error("request failed: {0}")]
    Transport(String),

    /// Non-2xx HTTP response.
    #[error("HTTP status {0}")]
    Status(u16),

    /// The attempt exceeded the per-request timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Response body was not a decodable image.
    #[error("image decode failed: {0}")]
    Decode(String),

    /// Missing credential, unresolvable template, or similar. Never
    /// retried.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl FetchFailure {
    /// Whether a retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchFailure::Configuration(_))
    }
}

/// An opaque decoded raster, RGBA8, row-major.
///
/// Shared by `Arc` between the cache and any renderer currently drawing
/// it, so eviction never invalidates pixels still in use.
#[derive(Debug, Clone, PartialEq)]
pub struct TileImage {
    width: u32,
    height: u32,
    pixels: Bytes,
}

impl TileImage {
    /// Wraps a decoded RGBA8 buffer.
    ///
    /// The buffer length must be `width * height * 4`.
    pub fn new(width: u32, height: u32, pixels: Bytes) -> Self {
        debug_assert_eq!(pixels.len(), (width * height * 4) as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 pixel data.
    pub fn pixels(&self) -> &Bytes {
        &self.pixels
    }

    /// Buffer size in bytes.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

/// A cache entry in its terminal state.
///
/// Entries are only inserted once a fetch has completed: either loaded
/// (image present) or failed (failure reason present). The in-flight
/// "loading" phase is tracked by the fetch coordinator, not the cache.
#[derive(Debug, Clone)]
pub struct CachedTile {
    /// The tile's grid address.
    pub coord: TileCoord,

    /// Decoded raster; `None` for failed entries.
    pub image: Option<Arc<TileImage>>,

    /// When the fetch completed. Drives expiry.
    pub fetched_at: Instant,

    /// True once the fetch exhausted its retry budget (or hit a
    /// non-retryable failure).
    pub failed: bool,

    /// Why the fetch failed, when it did.
    pub failure: Option<FetchFailure>,

    /// Retries consumed before reaching this state.
    pub retry_count: u32,
}

impl CachedTile {
    /// A successfully fetched and decoded tile.
    pub fn loaded(coord: TileCoord, image: Arc<TileImage>, retry_count: u32) -> Self {
        Self {
            coord,
            image: Some(image),
            fetched_at: Instant::now(),
            failed: false,
            failure: None,
            retry_count,
        }
    }

    /// A tile whose fetch reached a terminal failure.
    pub fn failed(coord: TileCoord, failure: FetchFailure, retry_count: u32) -> Self {
        Self {
            coord,
            image: None,
            fetched_at: Instant::now(),
            failed: true,
            failure: Some(failure),
            retry_count,
        }
    }

    /// Whether the entry's age exceeds the given expiry window.
    pub fn is_expired(&self, expiry: Duration) -> bool {
        self.fetched_at.elapsed() > expiry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord() -> TileCoord {
        TileCoord::new(512, 380, 10).unwrap()
    }

    fn image() -> Arc<TileImage> {
        Arc::new(TileImage::new(1, 1, Bytes::from_static(&[0, 0, 0, 255])))
    }

    #[test]
    fn test_loaded_tile_state() {
        let tile = CachedTile::loaded(coord(), image(), 0);
        assert!(!tile.failed);
        assert!(tile.failure.is_none());
        assert!(tile.image.is_some());
        assert_eq!(tile.retry_count, 0);
    }

    #[test]
    fn test_failed_tile_state() {
        let tile = CachedTile::failed(coord(), FetchFailure::Status(503), 3);
        assert!(tile.failed);
        assert!(tile.image.is_none());
        assert_eq!(tile.failure, Some(FetchFailure::Status(503)));
        assert_eq!(tile.retry_count, 3);
    }

    #[test]
    fn test_expiry_window() {
        let tile = CachedTile::loaded(coord(), image(), 0);
        assert!(!tile.is_expired(Duration::from_secs(60)));
        assert!(tile.is_expired(Duration::ZERO));
    }

    #[test]
    fn test_retryability() {
        assert!(FetchFailure::Transport("reset".into()).is_retryable());
        assert!(FetchFailure::Status(500).is_retryable());
        assert!(FetchFailure::Timeout(Duration::from_secs(10)).is_retryable());
        assert!(FetchFailure::Decode("bad magic".into()).is_retryable());
        assert!(!FetchFailure::Configuration("no key".into()).is_retryable());
    }

    #[test]
    fn test_image_dimensions() {
        let img = TileImage::new(2, 2, Bytes::from(vec![0u8; 16]));
        assert_eq!(img.width(), 2);
        assert_eq!(img.height(), 2);
        assert_eq!(img.len(), 16);
        assert!(!img.is_empty());
    }
}
