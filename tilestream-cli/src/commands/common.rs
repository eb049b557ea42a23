//! Common types and utilities shared across CLI commands.

use clap::ValueEnum;

use tilestream::config::ConfigFile;
use tilestream::provider::{MapStyle, TileProvider};
use tilestream::service::TileServiceConfig;

use crate::error::CliError;

/// Tile provider selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum ProviderArg {
    /// OpenStreetMap standard layer (no API key required)
    Openstreetmap,
    /// OpenStreetMap Humanitarian layer
    OpenstreetmapHumanitarian,
    /// CartoDB Voyager basemap
    CartodbVoyager,
    /// CartoDB Positron (light) basemap
    CartodbPositron,
    /// CartoDB Dark Matter basemap
    CartodbDarkmatter,
    /// Stamen Toner
    StamenToner,
    /// Stamen Terrain
    StamenTerrain,
    /// Stamen Watercolor
    StamenWatercolor,
    /// Esri World Imagery (satellite)
    EsriWorldImagery,
    /// Esri World Street Map
    EsriWorldStreetmap,
    /// Esri World Topo Map
    EsriWorldTopomap,
    /// OpenTopoMap
    Opentopomap,
    /// Mapbox (requires API key)
    Mapbox,
    /// Google Maps Static API (requires API key)
    Googlemaps,
    /// MapTiler Cloud (requires API key)
    Maptiler,
    /// User-supplied URL template
    Custom,
}

impl From<ProviderArg> for TileProvider {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Openstreetmap => TileProvider::OpenStreetMap,
            ProviderArg::OpenstreetmapHumanitarian => TileProvider::OpenStreetMapHumanitarian,
            ProviderArg::CartodbVoyager => TileProvider::CartoDbVoyager,
            ProviderArg::CartodbPositron => TileProvider::CartoDbPositron,
            ProviderArg::CartodbDarkmatter => TileProvider::CartoDbDarkMatter,
            ProviderArg::StamenToner => TileProvider::StamenToner,
            ProviderArg::StamenTerrain => TileProvider::StamenTerrain,
            ProviderArg::StamenWatercolor => TileProvider::StamenWatercolor,
            ProviderArg::EsriWorldImagery => TileProvider::EsriWorldImagery,
            ProviderArg::EsriWorldStreetmap => TileProvider::EsriWorldStreetMap,
            ProviderArg::EsriWorldTopomap => TileProvider::EsriWorldTopoMap,
            ProviderArg::Opentopomap => TileProvider::OpenTopoMap,
            ProviderArg::Mapbox => TileProvider::Mapbox,
            ProviderArg::Googlemaps => TileProvider::GoogleMaps,
            ProviderArg::Maptiler => TileProvider::MapTiler,
            ProviderArg::Custom => TileProvider::Custom,
        }
    }
}

/// Map style selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum StyleArg {
    Streets,
    Satellite,
    Hybrid,
    Dark,
    Light,
    Terrain,
}

impl From<StyleArg> for MapStyle {
    fn from(arg: StyleArg) -> Self {
        match arg {
            StyleArg::Streets => MapStyle::Streets,
            StyleArg::Satellite => MapStyle::Satellite,
            StyleArg::Hybrid => MapStyle::Hybrid,
            StyleArg::Dark => MapStyle::Dark,
            StyleArg::Light => MapStyle::Light,
            StyleArg::Terrain => MapStyle::Terrain,
        }
    }
}

/// Builds service configuration from the config file plus CLI overrides.
///
/// Checks up front that the selected provider has a usable credential so
/// the user gets one clear message instead of per-tile failures.
pub fn build_service_config(
    provider: Option<ProviderArg>,
    style: Option<StyleArg>,
    api_key: Option<String>,
) -> Result<TileServiceConfig, CliError> {
    let file = ConfigFile::load().unwrap_or_default();
    let config = TileServiceConfig::from_config_file(&file)?;
    apply_overrides(config, provider, style, api_key)
}

/// Applies CLI overrides and validates credentials.
fn apply_overrides(
    mut config: TileServiceConfig,
    provider: Option<ProviderArg>,
    style: Option<StyleArg>,
    api_key: Option<String>,
) -> Result<TileServiceConfig, CliError> {
    if let Some(provider) = provider {
        config.provider.provider = provider.into();
    }
    if let Some(style) = style {
        config.provider.style = style.into();
    }
    if let Some(key) = api_key {
        config.provider.set_api_key(key);
    }

    let active = config.provider.provider;
    let missing_key = match active {
        TileProvider::Mapbox if config.provider.mapbox_api_key.is_empty() => {
            Some("provider.mapbox_api_key")
        }
        TileProvider::GoogleMaps if config.provider.google_api_key.is_empty() => {
            Some("provider.google_api_key")
        }
        TileProvider::MapTiler if config.provider.maptiler_api_key.is_empty() => {
            Some("provider.maptiler_api_key")
        }
        _ => None,
    };
    if let Some(config_key) = missing_key {
        return Err(CliError::Config(format!(
            "{} requires an API key. Set {config_key} in the config file or pass --api-key",
            active.name()
        )));
    }

    Ok(config)
}
