//! Enumerated configuration keys for CLI get/set/list.

use std::str::FromStr;

use super::file::{ConfigError, ConfigFile};

/// A recognized `section.key` configuration setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    ProviderName,
    ProviderStyle,
    TileSize,
    CustomUrlTemplate,
    MapboxApiKey,
    GoogleApiKey,
    MaptilerApiKey,
    MinZoom,
    MaxZoom,
    CacheMaxTiles,
    CacheExpirySecs,
    RequestTimeoutSecs,
    RetryAttempts,
    RetryDelaySecs,
    MaxConcurrentDownloads,
}

impl ConfigKey {
    /// All keys in file order, grouped by section.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::ProviderName,
            ConfigKey::ProviderStyle,
            ConfigKey::TileSize,
            ConfigKey::CustomUrlTemplate,
            ConfigKey::MapboxApiKey,
            ConfigKey::GoogleApiKey,
            ConfigKey::MaptilerApiKey,
            ConfigKey::MinZoom,
            ConfigKey::MaxZoom,
            ConfigKey::CacheMaxTiles,
            ConfigKey::CacheExpirySecs,
            ConfigKey::RequestTimeoutSecs,
            ConfigKey::RetryAttempts,
            ConfigKey::RetryDelaySecs,
            ConfigKey::MaxConcurrentDownloads,
        ]
    }

    /// INI section this key lives in.
    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::ProviderName
            | ConfigKey::ProviderStyle
            | ConfigKey::TileSize
            | ConfigKey::CustomUrlTemplate
            | ConfigKey::MapboxApiKey
            | ConfigKey::GoogleApiKey
            | ConfigKey::MaptilerApiKey => "provider",
            ConfigKey::MinZoom | ConfigKey::MaxZoom => "map",
            ConfigKey::CacheMaxTiles | ConfigKey::CacheExpirySecs => "cache",
            ConfigKey::RequestTimeoutSecs
            | ConfigKey::RetryAttempts
            | ConfigKey::RetryDelaySecs
            | ConfigKey::MaxConcurrentDownloads => "network",
        }
    }

    /// Key name within its section.
    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::ProviderName => "name",
            ConfigKey::ProviderStyle => "style",
            ConfigKey::TileSize => "tile_size",
            ConfigKey::CustomUrlTemplate => "custom_url_template",
            ConfigKey::MapboxApiKey => "mapbox_api_key",
            ConfigKey::GoogleApiKey => "google_api_key",
            ConfigKey::MaptilerApiKey => "maptiler_api_key",
            ConfigKey::MinZoom => "min_zoom",
            ConfigKey::MaxZoom => "max_zoom",
            ConfigKey::CacheMaxTiles => "max_tiles",
            ConfigKey::CacheExpirySecs => "expiry_secs",
            ConfigKey::RequestTimeoutSecs => "request_timeout_secs",
            ConfigKey::RetryAttempts => "retry_attempts",
            ConfigKey::RetryDelaySecs => "retry_delay_secs",
            ConfigKey::MaxConcurrentDownloads => "max_concurrent_downloads",
        }
    }

    /// Fully qualified `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Reads this setting's current value as a string.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::ProviderName => config.provider.clone(),
            ConfigKey::ProviderStyle => config.style.clone(),
            ConfigKey::TileSize => config.tile_size.to_string(),
            ConfigKey::CustomUrlTemplate => config.custom_url_template.clone(),
            ConfigKey::MapboxApiKey => config.mapbox_api_key.clone(),
            ConfigKey::GoogleApiKey => config.google_api_key.clone(),
            ConfigKey::MaptilerApiKey => config.maptiler_api_key.clone(),
            ConfigKey::MinZoom => config.min_zoom.to_string(),
            ConfigKey::MaxZoom => config.max_zoom.to_string(),
            ConfigKey::CacheMaxTiles => config.cache_max_tiles.to_string(),
            ConfigKey::CacheExpirySecs => config.cache_expiry_secs.to_string(),
            ConfigKey::RequestTimeoutSecs => config.request_timeout_secs.to_string(),
            ConfigKey::RetryAttempts => config.retry_attempts.to_string(),
            ConfigKey::RetryDelaySecs => config.retry_delay_secs.to_string(),
            ConfigKey::MaxConcurrentDownloads => config.max_concurrent_downloads.to_string(),
        }
    }

    /// Writes a new value, validating numeric fields.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        fn parse<T: FromStr>(key: &ConfigKey, value: &str) -> Result<T, ConfigError> {
            value.parse().map_err(|_| ConfigError::InvalidValue {
                key: key.name(),
                value: value.to_string(),
            })
        }

        match self {
            ConfigKey::ProviderName => config.provider = value.to_string(),
            ConfigKey::ProviderStyle => config.style = value.to_string(),
            ConfigKey::TileSize => config.tile_size = parse(self, value)?,
            ConfigKey::CustomUrlTemplate => config.custom_url_template = value.to_string(),
            ConfigKey::MapboxApiKey => config.mapbox_api_key = value.to_string(),
            ConfigKey::GoogleApiKey => config.google_api_key = value.to_string(),
            ConfigKey::MaptilerApiKey => config.maptiler_api_key = value.to_string(),
            ConfigKey::MinZoom => config.min_zoom = parse(self, value)?,
            ConfigKey::MaxZoom => config.max_zoom = parse(self, value)?,
            ConfigKey::CacheMaxTiles => config.cache_max_tiles = parse(self, value)?,
            ConfigKey::CacheExpirySecs => config.cache_expiry_secs = parse(self, value)?,
            ConfigKey::RequestTimeoutSecs => config.request_timeout_secs = parse(self, value)?,
            ConfigKey::RetryAttempts => config.retry_attempts = parse(self, value)?,
            ConfigKey::RetryDelaySecs => config.retry_delay_secs = parse(self, value)?,
            ConfigKey::MaxConcurrentDownloads => {
                config.max_concurrent_downloads = parse(self, value)?
            }
        }
        Ok(())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        ConfigKey::all()
            .iter()
            .find(|key| key.name() == normalized)
            .copied()
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}
