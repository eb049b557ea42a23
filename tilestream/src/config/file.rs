//! INI-backed configuration file.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::Ini;
use thiserror::Error;

/// Errors while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(String),

    #[error("unknown configuration key: {0}")]
    UnknownKey(String),

    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

/// Location of the configuration file.
///
/// `$XDG_CONFIG_HOME/tilestream/config.ini` (or the platform equivalent),
/// falling back to the working directory when no config dir exists.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tilestream")
        .join("config.ini")
}

/// All recognized configuration settings, with defaults for anything the
/// file does not mention.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Provider name, e.g. `openstreetmap`, `cartodb-voyager`.
    pub provider: String,
    /// Style name, e.g. `streets`, `dark`.
    pub style: String,
    /// Tile raster size in pixels.
    pub tile_size: u32,
    /// Template for the custom provider.
    pub custom_url_template: String,
    /// Mapbox access token.
    pub mapbox_api_key: String,
    /// Google Maps Platform API key.
    pub google_api_key: String,
    /// MapTiler Cloud API key.
    pub maptiler_api_key: String,

    /// Lowest zoom level served.
    pub min_zoom: u8,
    /// Highest zoom level served.
    pub max_zoom: u8,

    /// Cache capacity in tiles.
    pub cache_max_tiles: usize,
    /// Cache entry lifetime in seconds; 0 disables expiry.
    pub cache_expiry_secs: u64,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Total attempts per fetch.
    pub retry_attempts: u32,
    /// Base backoff delay in seconds.
    pub retry_delay_secs: u64,
    /// Maximum concurrent downloads.
    pub max_concurrent_downloads: usize,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            provider: "openstreetmap".to_string(),
            style: "streets".to_string(),
            tile_size: 256,
            custom_url_template: String::new(),
            mapbox_api_key: String::new(),
            google_api_key: String::new(),
            maptiler_api_key: String::new(),
            min_zoom: 0,
            max_zoom: 19,
            cache_max_tiles: 512,
            cache_expiry_secs: 1800,
            request_timeout_secs: 10,
            retry_attempts: 3,
            retry_delay_secs: 1,
            max_concurrent_downloads: 4,
        }
    }
}

impl ConfigFile {
    /// Loads from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Loads from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(io) => ConfigError::Io(io),
            ini::Error::Parse(parse) => ConfigError::Parse(parse.to_string()),
        })?;

        let defaults = Self::default();
        Ok(Self {
            provider: read_string(&ini, "provider", "name", &defaults.provider),
            style: read_string(&ini, "provider", "style", &defaults.style),
            tile_size: read_parsed(&ini, "provider", "tile_size", defaults.tile_size)?,
            custom_url_template: read_string(
                &ini,
                "provider",
                "custom_url_template",
                &defaults.custom_url_template,
            ),
            mapbox_api_key: read_string(&ini, "provider", "mapbox_api_key", ""),
            google_api_key: read_string(&ini, "provider", "google_api_key", ""),
            maptiler_api_key: read_string(&ini, "provider", "maptiler_api_key", ""),
            min_zoom: read_parsed(&ini, "map", "min_zoom", defaults.min_zoom)?,
            max_zoom: read_parsed(&ini, "map", "max_zoom", defaults.max_zoom)?,
            cache_max_tiles: read_parsed(&ini, "cache", "max_tiles", defaults.cache_max_tiles)?,
            cache_expiry_secs: read_parsed(&ini, "cache", "expiry_secs", defaults.cache_expiry_secs)?,
            request_timeout_secs: read_parsed(
                &ini,
                "network",
                "request_timeout_secs",
                defaults.request_timeout_secs,
            )?,
            retry_attempts: read_parsed(&ini, "network", "retry_attempts", defaults.retry_attempts)?,
            retry_delay_secs: read_parsed(
                &ini,
                "network",
                "retry_delay_secs",
                defaults.retry_delay_secs,
            )?,
            max_concurrent_downloads: read_parsed(
                &ini,
                "network",
                "max_concurrent_downloads",
                defaults.max_concurrent_downloads,
            )?,
        })
    }

    /// Saves to the default location, creating the directory if needed.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Saves to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut ini = Ini::new();
        ini.with_section(Some("provider"))
            .set("name", self.provider.clone())
            .set("style", self.style.clone())
            .set("tile_size", self.tile_size.to_string())
            .set("custom_url_template", self.custom_url_template.clone())
            .set("mapbox_api_key", self.mapbox_api_key.clone())
            .set("google_api_key", self.google_api_key.clone())
            .set("maptiler_api_key", self.maptiler_api_key.clone());
        ini.with_section(Some("map"))
            .set("min_zoom", self.min_zoom.to_string())
            .set("max_zoom", self.max_zoom.to_string());
        ini.with_section(Some("cache"))
            .set("max_tiles", self.cache_max_tiles.to_string())
            .set("expiry_secs", self.cache_expiry_secs.to_string());
        ini.with_section(Some("network"))
            .set("request_timeout_secs", self.request_timeout_secs.to_string())
            .set("retry_attempts", self.retry_attempts.to_string())
            .set("retry_delay_secs", self.retry_delay_secs.to_string())
            .set(
                "max_concurrent_downloads",
                self.max_concurrent_downloads.to_string(),
            );

        ini.write_to_file(path)?;
        Ok(())
    }
}

fn read_string(ini: &Ini, section: &str, key: &str, default: &str) -> String {
    ini.get_from(Some(section), key)
        .map(str::to_string)
        .unwrap_or_else(|| default.to_string())
}

fn read_parsed<T: FromStr + Copy>(
    ini: &Ini,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match ini.get_from(Some(section), key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: format!("{section}.{key}"),
            value: raw.to_string(),
        }),
    }
}
