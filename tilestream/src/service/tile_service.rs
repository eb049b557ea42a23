//! The tile service facade.
//!
//! Composes the cache, the fetch coordinator and the event registry into
//! the public contract: non-blocking cache-or-trigger lookup, exactly-once
//! async callbacks, area preloading, provider/style switching with cache
//! invalidation, and statistics.
//!
//! Designed for a cooperative caller (a per-frame update loop) issuing
//! many lookups: every method returns without blocking; only the fetch
//! tasks themselves suspend, on network I/O and retry backoff.

use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, CachedTile, FetchFailure, TileCache, TileImage, TileKey};
use crate::coord::{haversine_distance, tile_for_coord, GeoBounds, GeoCoord, TileCoord};
use crate::fetch::{FetchCoordinator, ReqwestTileClient, TileHttpClient};
use crate::provider::{MapStyle, ProviderConfig, TileProvider};
use crate::service::config::TileServiceConfig;
use crate::service::events::{TileEvent, TileEvents};
use crate::service::offline::OfflineProgress;

/// Errors surfaced by the service's fallible entry points.
///
/// Lookup paths never raise: failures travel as terminal state on the
/// [`CachedTile`] instead.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// HTTP client construction failed.
    #[error("failed to initialize HTTP client: {0}")]
    ClientInit(String),

    /// Constructed outside a Tokio runtime with no handle supplied.
    #[error("no Tokio runtime available; construct the service inside a runtime")]
    NoRuntime,

    /// Requested zoom outside the configured serving range.
    #[error("zoom {zoom} outside configured range {min}..={max}")]
    ZoomOutOfRange { zoom: u8, min: u8, max: u8 },

    /// No offline store implementation is wired up.
    #[error("offline tile storage is not implemented")]
    OfflineStoreUnavailable,
}

/// Map tile acquisition and caching service.
///
/// Explicitly constructed and shared by `Arc`; there is no global
/// instance. All methods take `&self` and are safe to call from multiple
/// threads.
pub struct TileService {
    cache: Arc<TileCache>,
    coordinator: Arc<FetchCoordinator>,
    events: Arc<TileEvents>,
    provider: Mutex<ProviderConfig>,
    /// Bumped on every provider/style change; completions carrying an
    /// older value are discarded.
    generation: Arc<AtomicU64>,
    min_zoom: u8,
    max_zoom: u8,
}

/// Broadcast buffer size for tile events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

impl TileService {
    /// Creates a service with a real HTTP client.
    ///
    /// Must be called within a Tokio runtime; fetch tasks are spawned on
    /// the current handle.
    pub fn new(config: TileServiceConfig) -> Result<Self, ServiceError> {
        let runtime = Handle::try_current().map_err(|_| ServiceError::NoRuntime)?;
        let http = ReqwestTileClient::new(config.fetch.request_timeout, &config.user_agent)
            .map_err(|e| ServiceError::ClientInit(e.to_string()))?;
        Ok(Self::with_client(config, Arc::new(http), runtime))
    }

    /// Creates a service with an injected HTTP client and runtime handle.
    ///
    /// The seam used by tests and by embedders that manage their own
    /// transport.
    pub fn with_client(
        config: TileServiceConfig,
        http: Arc<dyn TileHttpClient>,
        runtime: Handle,
    ) -> Self {
        let coordinator = FetchCoordinator::new(http, config.fetch.clone(), runtime);
        Self {
            cache: Arc::new(TileCache::new(config.cache_max_tiles, config.cache_expiry)),
            coordinator: Arc::new(coordinator),
            events: Arc::new(TileEvents::new(EVENT_CHANNEL_CAPACITY)),
            provider: Mutex::new(config.provider),
            generation: Arc::new(AtomicU64::new(0)),
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
        }
    }

    /// Returns the tile's image if cached and live, otherwise triggers a
    /// background fetch and returns `None` ("ask again later").
    ///
    /// A tile in the failed state also returns `None` but does not
    /// re-trigger; it retries only after its cache entry expires.
    pub fn get_tile(&self, coord: &TileCoord) -> Option<Arc<TileImage>> {
        if let Err(e) = self.check_zoom(coord) {
            debug!(coord = %coord, error = %e, "tile request rejected");
            return None;
        }

        let key = self.key_for(coord);
        match self.cache.get(&key) {
            Some(tile) => tile.image,
            None => {
                self.trigger_fetch(key, *coord);
                None
            }
        }
    }

    /// Invokes `callback` with the tile's terminal state: synchronously if
    /// cached, otherwise exactly once when the pending (or newly
    /// triggered) fetch completes.
    pub fn get_tile_async<F>(&self, coord: &TileCoord, callback: F)
    where
        F: FnOnce(&CachedTile) + Send + 'static,
    {
        if let Err(e) = self.check_zoom(coord) {
            let rejected =
                CachedTile::failed(*coord, FetchFailure::Configuration(e.to_string()), 0);
            callback(&rejected);
            return;
        }

        let key = self.key_for(coord);
        let cache = Arc::clone(&self.cache);
        let registered =
            self.events
                .register_waiter(key, Box::new(callback), || cache.get(&key));
        if registered {
            self.trigger_fetch(key, *coord);
        }
    }

    /// Triggers fetches for every uncached tile covering `bounds` at
    /// `zoom`. Returns how many fetches were newly started; cached tiles
    /// and tiles already in flight are not counted.
    pub fn preload_area(&self, bounds: &GeoBounds, zoom: u8) -> usize {
        if zoom < self.min_zoom || zoom > self.max_zoom {
            warn!(
                zoom,
                min = self.min_zoom,
                max = self.max_zoom,
                "preload zoom outside configured range"
            );
            return 0;
        }

        let north_west = match tile_for_coord(bounds.north, bounds.west, zoom) {
            Ok(tile) => tile,
            Err(e) => {
                warn!(error = %e, "preload bounds rejected");
                return 0;
            }
        };
        let south_east = match tile_for_coord(bounds.south, bounds.east, zoom) {
            Ok(tile) => tile,
            Err(e) => {
                warn!(error = %e, "preload bounds rejected");
                return 0;
            }
        };

        let (provider, style) = {
            let config = self.provider.lock();
            (config.provider, config.style)
        };

        let mut triggered = 0usize;
        let mut total = 0usize;
        for y in north_west.y()..=south_east.y() {
            for x in north_west.x()..=south_east.x() {
                let Ok(coord) = TileCoord::new(x, y, zoom) else {
                    continue;
                };
                total += 1;
                let key = TileKey::new(provider, style, &coord);
                if self.cache.get(&key).is_none() && self.trigger_fetch(key, coord) {
                    triggered += 1;
                }
            }
        }

        let mid_lat = bounds.center().lat;
        let width_m = haversine_distance(
            GeoCoord::new(mid_lat, bounds.west),
            GeoCoord::new(mid_lat, bounds.east),
        );
        let height_m = haversine_distance(
            GeoCoord::new(bounds.north, bounds.west),
            GeoCoord::new(bounds.south, bounds.west),
        );
        info!(
            zoom,
            tiles = total,
            triggered,
            width_m = width_m as u64,
            height_m = height_m as u64,
            "preloading area"
        );

        triggered
    }

    /// Switches the active provider, optionally updating its credential.
    ///
    /// Cached tiles from the previous provider are not valid substitutes,
    /// so the cache is emptied and in-flight results from the old
    /// generation will be discarded on completion.
    pub fn set_provider(&self, provider: TileProvider, api_key: Option<String>) {
        {
            let mut config = self.provider.lock();
            config.provider = provider;
            if let Some(key) = api_key {
                config.set_api_key(key);
            }
        }
        self.invalidate_after_reconfig("provider", provider.name());
    }

    /// Switches the active map style, emptying the cache.
    pub fn set_style(&self, style: MapStyle) {
        self.provider.lock().style = style;
        self.invalidate_after_reconfig("style", style.name());
    }

    /// Empties the cache without changing provider or style.
    pub fn clear_cache(&self) {
        self.cache.invalidate();
        debug!("tile cache cleared");
    }

    /// Cache statistics snapshot.
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Subscribes to loaded/failed tile events.
    pub fn subscribe(&self) -> broadcast::Receiver<TileEvent> {
        self.events.subscribe()
    }

    /// Number of fetches currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.coordinator.in_flight_count()
    }

    /// Current provider/style generation. Diagnostic.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// The active provider and style.
    pub fn active_provider(&self) -> (TileProvider, MapStyle) {
        let config = self.provider.lock();
        (config.provider, config.style)
    }

    /// Cancels all outstanding fetches.
    pub fn shutdown(&self) {
        self.coordinator.shutdown();
        info!("tile service shut down");
    }

    /// Downloads an area into durable offline storage.
    ///
    /// Interface only: no [`crate::service::OfflineTileStore`]
    /// implementation exists yet, so this always reports the store as
    /// unavailable.
    pub fn download_area_for_offline(
        &self,
        _bounds: &GeoBounds,
        _zoom_range: RangeInclusive<u8>,
        _progress: Option<OfflineProgress>,
    ) -> Result<usize, ServiceError> {
        Err(ServiceError::OfflineStoreUnavailable)
    }

    fn check_zoom(&self, coord: &TileCoord) -> Result<(), ServiceError> {
        let zoom = coord.zoom();
        if zoom < self.min_zoom || zoom > self.max_zoom {
            return Err(ServiceError::ZoomOutOfRange {
                zoom,
                min: self.min_zoom,
                max: self.max_zoom,
            });
        }
        Ok(())
    }

    fn key_for(&self, coord: &TileCoord) -> TileKey {
        let config = self.provider.lock();
        TileKey::new(config.provider, config.style, coord)
    }

    /// Starts a background fetch for `key` unless one is in flight or the
    /// tile landed in the cache since the caller's lookup. Returns whether
    /// a new fetch was started.
    fn trigger_fetch(&self, key: TileKey, coord: TileCoord) -> bool {
        if self.cache.contains(&key) {
            return false;
        }

        let provider = self.provider.lock().clone();
        let generation = Arc::clone(&self.generation);
        let started_generation = generation.load(Ordering::SeqCst);
        let cache = Arc::clone(&self.cache);
        let events = Arc::clone(&self.events);

        self.coordinator.spawn_fetch(
            key,
            coord,
            provider,
            Box::new(move |tile| {
                if generation.load(Ordering::SeqCst) != started_generation {
                    debug!(key = %key, "discarding completion from stale provider generation");
                    events.discard(key);
                    return;
                }
                cache.put(key, tile.clone());
                events.complete(key, &tile);
            }),
        )
    }

    fn invalidate_after_reconfig(&self, what: &str, name: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate();
        info!(
            changed = what,
            value = name,
            generation = self.generation.load(Ordering::SeqCst),
            "tile configuration changed, cache invalidated"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FetchFailure;
    use crate::fetch::MockTileClient;
    use bytes::Bytes;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn coord(x: u32, y: u32, zoom: u8) -> TileCoord {
        TileCoord::new(x, y, zoom).unwrap()
    }

    fn encoded_tile() -> Bytes {
        let img = image::RgbaImage::from_pixel(1, 1, image::Rgba([1, 2, 3, 255]));
        let mut buf = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        Bytes::from(buf.into_inner())
    }

    fn fast_config() -> TileServiceConfig {
        TileServiceConfig::default()
            .with_retry(3, Duration::from_millis(5))
            .with_request_timeout(Duration::from_millis(250))
    }

    fn service_with(mock: Arc<MockTileClient>, config: TileServiceConfig) -> TileService {
        TileService::with_client(config, mock, Handle::current())
    }

    async fn await_tile(service: &TileService, c: &TileCoord) -> CachedTile {
        let (tx, rx) = oneshot::channel();
        service.get_tile_async(c, move |tile| {
            let _ = tx.send(tile.clone());
        });
        tokio::time::timeout(Duration::from_secs(5), rx)
            .await
            .expect("tile completion timed out")
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_tile_miss_then_hit() {
        let mock = Arc::new(MockTileClient::new(Ok(encoded_tile())));
        let service = service_with(mock.clone(), fast_config());
        let c = coord(512, 380, 10);

        // First lookup misses and triggers a background fetch
        assert!(service.get_tile(&c).is_none());
        await_tile(&service, &c).await;

        // Now cached
        let image = service.get_tile(&c).expect("tile should be cached");
        assert_eq!((image.width(), image.height()), (1, 1));
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn test_get_tile_async_synchronous_on_hit() {
        let mock = Arc::new(MockTileClient::new(Ok(encoded_tile())));
        let service = service_with(mock.clone(), fast_config());
        let c = coord(512, 380, 10);

        service.get_tile(&c);
        await_tile(&service, &c).await;

        // Cached now: the callback runs before get_tile_async returns
        let (tx, mut rx) = oneshot::channel();
        service.get_tile_async(&c, move |tile| {
            let _ = tx.send(tile.failed);
        });
        assert!(matches!(rx.try_recv(), Ok(false)));
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_fetch() {
        let mock =
            Arc::new(MockTileClient::new(Ok(encoded_tile())).with_delay(Duration::from_millis(50)));
        let service = service_with(mock.clone(), fast_config());
        let c = coord(512, 380, 10);

        let (tx1, rx1) = oneshot::channel();
        service.get_tile_async(&c, move |tile| {
            let _ = tx1.send(tile.clone());
        });
        let (tx2, rx2) = oneshot::channel();
        service.get_tile_async(&c, move |tile| {
            let _ = tx2.send(tile.clone());
        });
        // And a sync lookup piles onto the same in-flight fetch
        assert!(service.get_tile(&c).is_none());

        let first = rx1.await.unwrap();
        let second = rx2.await.unwrap();
        assert!(!first.failed && !second.failed);
        assert_eq!(mock.request_count(), 1, "dedup: one request on the wire");
    }

    #[tokio::test]
    async fn test_failed_tile_negative_cached() {
        let mock = Arc::new(MockTileClient::new(Err(FetchFailure::Status(500))));
        let service = service_with(mock.clone(), fast_config());
        let c = coord(512, 380, 10);

        let tile = await_tile(&service, &c).await;
        assert!(tile.failed);
        assert_eq!(tile.retry_count, 3);
        assert_eq!(mock.request_count(), 3);

        // The failed entry absorbs further lookups without refetching
        assert!(service.get_tile(&c).is_none());
        assert_eq!(mock.request_count(), 3);
        assert_eq!(service.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_set_provider_empties_cache() {
        let mock = Arc::new(MockTileClient::new(Ok(encoded_tile())));
        let service = service_with(mock.clone(), fast_config());
        let c = coord(512, 380, 10);

        await_tile(&service, &c).await;
        assert_eq!(service.stats().count, 1);

        service.set_provider(TileProvider::CartoDbVoyager, None);
        assert_eq!(service.stats().count, 0);
        assert_eq!(service.generation(), 1);
        assert_eq!(
            service.active_provider().0,
            TileProvider::CartoDbVoyager
        );
    }

    #[tokio::test]
    async fn test_set_style_empties_cache() {
        let mock = Arc::new(MockTileClient::new(Ok(encoded_tile())));
        let service = service_with(mock.clone(), fast_config());
        let c = coord(512, 380, 10);

        await_tile(&service, &c).await;
        assert_eq!(service.stats().count, 1);

        service.set_style(MapStyle::Dark);
        assert_eq!(service.stats().count, 0);
        assert_eq!(service.active_provider().1, MapStyle::Dark);
    }

    #[tokio::test]
    async fn test_stale_completion_discarded_after_provider_change() {
        let mock = Arc::new(
            MockTileClient::new(Ok(encoded_tile())).with_delay(Duration::from_millis(60)),
        );
        let service = service_with(mock.clone(), fast_config());
        let c = coord(512, 380, 10);

        // Fetch starts against the old provider...
        assert!(service.get_tile(&c).is_none());
        // ...and the provider changes while it is in flight
        service.set_provider(TileProvider::OpenTopoMap, None);

        tokio::time::sleep(Duration::from_millis(150)).await;

        // The old-generation result must not repopulate the cache
        assert_eq!(service.stats().count, 0);
    }

    #[tokio::test]
    async fn test_preload_area_counts_new_fetches() {
        let mock = Arc::new(MockTileClient::new(Ok(encoded_tile())));
        let service = service_with(mock.clone(), fast_config());

        // A small bounds rectangle; cache one of its tiles up front
        let bounds = GeoBounds::new(38.95, 38.85, -77.15, -77.35);
        let zoom = 12;
        let nw = tile_for_coord(bounds.north, bounds.west, zoom).unwrap();
        await_tile(&service, &nw).await;

        let mut events = service.subscribe();
        let triggered = service.preload_area(&bounds, zoom);
        assert!(triggered > 0);

        let se = tile_for_coord(bounds.south, bounds.east, zoom).unwrap();
        let expected_total = ((se.x() - nw.x() + 1) * (se.y() - nw.y() + 1)) as usize;
        assert_eq!(
            triggered,
            expected_total - 1,
            "cached tile must not be re-triggered"
        );

        // All triggered fetches complete
        let mut completed = 0;
        while completed < triggered {
            tokio::time::timeout(Duration::from_secs(5), events.recv())
                .await
                .expect("preload completion timed out")
                .unwrap();
            completed += 1;
        }
        assert_eq!(service.stats().count, expected_total);
    }

    #[tokio::test]
    async fn test_preload_rejects_out_of_range_zoom() {
        let mock = Arc::new(MockTileClient::new(Ok(encoded_tile())));
        let service = service_with(
            mock.clone(),
            fast_config().with_zoom_range(0, 10),
        );
        let bounds = GeoBounds::new(39.0, 38.0, -77.0, -78.0);
        assert_eq!(service.preload_area(&bounds, 15), 0);
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_zoom_out_of_range_rejected_before_network() {
        let mock = Arc::new(MockTileClient::new(Ok(encoded_tile())));
        let service = service_with(
            mock.clone(),
            fast_config().with_zoom_range(5, 15),
        );

        assert!(service.get_tile(&coord(0, 0, 2)).is_none());
        assert_eq!(mock.request_count(), 0);

        let (tx, rx) = oneshot::channel();
        service.get_tile_async(&coord(0, 0, 2), move |tile| {
            let _ = tx.send(tile.clone());
        });
        let tile = rx.await.unwrap();
        assert!(tile.failed);
        assert!(matches!(
            tile.failure,
            Some(FetchFailure::Configuration(_))
        ));
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_credential_surfaces_configuration_failure() {
        let mock = Arc::new(MockTileClient::new(Ok(encoded_tile())));
        let config = TileServiceConfig::new(TileProvider::Mapbox);
        let service = service_with(mock.clone(), config);

        let tile = await_tile(&service, &coord(512, 380, 10)).await;
        assert!(tile.failed);
        assert!(matches!(
            tile.failure,
            Some(FetchFailure::Configuration(_))
        ));
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let mock = Arc::new(MockTileClient::new(Ok(encoded_tile())));
        let service = service_with(mock.clone(), fast_config());
        let c = coord(512, 380, 10);

        await_tile(&service, &c).await;
        assert_eq!(service.stats().count, 1);

        service.clear_cache();
        assert_eq!(service.stats().count, 0);
        // Unlike set_provider, clearing keeps the generation
        assert_eq!(service.generation(), 0);
    }

    #[tokio::test]
    async fn test_offline_download_unimplemented() {
        let mock = Arc::new(MockTileClient::new(Ok(encoded_tile())));
        let service = service_with(mock, fast_config());
        let bounds = GeoBounds::new(39.0, 38.0, -77.0, -78.0);

        let result = service.download_area_for_offline(&bounds, 10..=12, None);
        assert!(matches!(
            result,
            Err(ServiceError::OfflineStoreUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_failure_event_carries_reason() {
        let mock = Arc::new(MockTileClient::new(Err(FetchFailure::Transport(
            "unreachable".into(),
        ))));
        let service = service_with(mock, fast_config());
        let mut events = service.subscribe();
        let c = coord(512, 380, 10);

        service.get_tile(&c);

        match tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap()
        {
            TileEvent::Failed { failure, .. } => {
                assert!(matches!(failure, FetchFailure::Transport(_)));
            }
            other => panic!("expected Failed event, got {other:?}"),
        }
    }
}
