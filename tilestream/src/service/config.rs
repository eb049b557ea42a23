//! Tile service configuration.

use std::time::Duration;

use crate::config::{ConfigError, ConfigFile};
use crate::fetch::FetchConfig;
use crate::provider::{MapStyle, ProviderConfig, TileProvider};

/// Default cache capacity in tiles.
pub const DEFAULT_CACHE_MAX_TILES: usize = 512;

/// Default cache entry lifetime.
///
/// Half an hour keeps a panning session responsive while letting slowly
/// changing basemaps refresh within a play session.
pub const DEFAULT_CACHE_EXPIRY: Duration = Duration::from_secs(1800);

/// Default User-Agent sent with every tile request.
pub const DEFAULT_USER_AGENT: &str = concat!("tilestream/", env!("CARGO_PKG_VERSION"));

/// Complete configuration for a [`crate::service::TileService`].
#[derive(Debug, Clone)]
pub struct TileServiceConfig {
    /// Active provider, style, tile size, credentials and custom template.
    pub provider: ProviderConfig,

    /// Lowest zoom level the service will fetch.
    pub min_zoom: u8,

    /// Highest zoom level the service will fetch.
    pub max_zoom: u8,

    /// Cache capacity in tiles.
    pub cache_max_tiles: usize,

    /// Cache entry lifetime; `None` disables expiry.
    pub cache_expiry: Option<Duration>,

    /// Network fetch tuning (concurrency, retry, timeout).
    pub fetch: FetchConfig,

    /// User-Agent header for tile requests.
    pub user_agent: String,
}

impl Default for TileServiceConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            min_zoom: 0,
            max_zoom: 19,
            cache_max_tiles: DEFAULT_CACHE_MAX_TILES,
            cache_expiry: Some(DEFAULT_CACHE_EXPIRY),
            fetch: FetchConfig::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl TileServiceConfig {
    /// Starts from defaults with the given provider selected.
    pub fn new(provider: TileProvider) -> Self {
        Self {
            provider: ProviderConfig::new(provider),
            ..Self::default()
        }
    }

    /// Sets the map style.
    pub fn with_style(mut self, style: MapStyle) -> Self {
        self.provider.style = style;
        self
    }

    /// Sets the credential for the selected provider.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.provider.set_api_key(key);
        self
    }

    /// Sets the template used by [`TileProvider::Custom`].
    pub fn with_custom_template(mut self, template: impl Into<String>) -> Self {
        self.provider.custom_url_template = template.into();
        self
    }

    /// Sets the cache capacity in tiles.
    pub fn with_cache_capacity(mut self, max_tiles: usize) -> Self {
        self.cache_max_tiles = max_tiles;
        self
    }

    /// Sets the cache entry lifetime.
    pub fn with_cache_expiry(mut self, expiry: Option<Duration>) -> Self {
        self.cache_expiry = expiry;
        self
    }

    /// Restricts the zoom range served.
    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    /// Sets the maximum number of concurrent downloads.
    pub fn with_max_concurrent_downloads(mut self, max: usize) -> Self {
        self.fetch.max_concurrent = max;
        self
    }

    /// Sets the retry budget and base backoff delay.
    pub fn with_retry(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.fetch.max_attempts = max_attempts;
        self.fetch.retry_delay = retry_delay;
        self
    }

    /// Sets the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.fetch.request_timeout = timeout;
        self
    }

    /// Builds service configuration from a loaded config file.
    ///
    /// Keeps the file-to-runtime translation in one place rather than
    /// scattered in CLI code.
    pub fn from_config_file(file: &ConfigFile) -> Result<Self, ConfigError> {
        let provider: TileProvider = file
            .provider
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                key: "provider.name".to_string(),
                value: file.provider.clone(),
            })?;
        let style: MapStyle = file.style.parse().map_err(|_| ConfigError::InvalidValue {
            key: "provider.style".to_string(),
            value: file.style.clone(),
        })?;

        Ok(Self {
            provider: ProviderConfig {
                provider,
                style,
                tile_size: file.tile_size,
                mapbox_api_key: file.mapbox_api_key.clone(),
                google_api_key: file.google_api_key.clone(),
                maptiler_api_key: file.maptiler_api_key.clone(),
                custom_url_template: file.custom_url_template.clone(),
            },
            min_zoom: file.min_zoom,
            max_zoom: file.max_zoom,
            cache_max_tiles: file.cache_max_tiles,
            cache_expiry: if file.cache_expiry_secs == 0 {
                None
            } else {
                Some(Duration::from_secs(file.cache_expiry_secs))
            },
            fetch: FetchConfig {
                max_concurrent: file.max_concurrent_downloads,
                max_attempts: file.retry_attempts,
                retry_delay: Duration::from_secs(file.retry_delay_secs),
                request_timeout: Duration::from_secs(file.request_timeout_secs),
            },
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }
}
