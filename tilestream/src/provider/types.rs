//! Provider and style enumerations plus the active provider configuration.

use std::str::FromStr;
use thiserror::Error;

/// Errors produced while resolving a tile URL.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    /// The provider requires an API key and none is configured.
    ///
    /// This is a configuration failure: retrying cannot succeed until the
    /// caller supplies a credential.
    #[error("{0} requires an API key and none is configured")]
    MissingApiKey(&'static str),

    /// The custom URL template is empty or lacks coordinate placeholders.
    #[error("invalid custom URL template: {0}")]
    InvalidCustomTemplate(String),

    /// Provider name not recognized when parsing configuration.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// Style name not recognized when parsing configuration.
    #[error("unknown style: {0}")]
    UnknownStyle(String),
}

/// The closed set of supported tile providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileProvider {
    OpenStreetMap,
    OpenStreetMapHumanitarian,
    CartoDbVoyager,
    CartoDbPositron,
    CartoDbDarkMatter,
    StamenToner,
    StamenTerrain,
    StamenWatercolor,
    EsriWorldImagery,
    EsriWorldStreetMap,
    EsriWorldTopoMap,
    OpenTopoMap,
    Mapbox,
    GoogleMaps,
    MapTiler,
    /// User-supplied URL template with `{x}`, `{y}`, `{z}`/`{zoom}`, `{s}`
    /// placeholders.
    Custom,
}

impl TileProvider {
    /// Human-readable provider name, also used as the config-file value.
    pub fn name(&self) -> &'static str {
        match self {
            TileProvider::OpenStreetMap => "openstreetmap",
            TileProvider::OpenStreetMapHumanitarian => "openstreetmap-humanitarian",
            TileProvider::CartoDbVoyager => "cartodb-voyager",
            TileProvider::CartoDbPositron => "cartodb-positron",
            TileProvider::CartoDbDarkMatter => "cartodb-darkmatter",
            TileProvider::StamenToner => "stamen-toner",
            TileProvider::StamenTerrain => "stamen-terrain",
            TileProvider::StamenWatercolor => "stamen-watercolor",
            TileProvider::EsriWorldImagery => "esri-world-imagery",
            TileProvider::EsriWorldStreetMap => "esri-world-streetmap",
            TileProvider::EsriWorldTopoMap => "esri-world-topomap",
            TileProvider::OpenTopoMap => "opentopomap",
            TileProvider::Mapbox => "mapbox",
            TileProvider::GoogleMaps => "googlemaps",
            TileProvider::MapTiler => "maptiler",
            TileProvider::Custom => "custom",
        }
    }

    /// Whether the provider refuses requests without an API key.
    pub fn requires_api_key(&self) -> bool {
        matches!(
            self,
            TileProvider::Mapbox | TileProvider::GoogleMaps | TileProvider::MapTiler
        )
    }

    /// Maximum zoom level the provider serves.
    pub fn max_zoom(&self) -> u8 {
        match self {
            TileProvider::OpenStreetMap | TileProvider::OpenStreetMapHumanitarian => 19,
            TileProvider::CartoDbVoyager
            | TileProvider::CartoDbPositron
            | TileProvider::CartoDbDarkMatter => 20,
            TileProvider::StamenToner
            | TileProvider::StamenTerrain
            | TileProvider::StamenWatercolor => 18,
            TileProvider::EsriWorldImagery
            | TileProvider::EsriWorldStreetMap
            | TileProvider::EsriWorldTopoMap => 19,
            TileProvider::OpenTopoMap => 17,
            TileProvider::Mapbox => 22,
            TileProvider::GoogleMaps => 21,
            TileProvider::MapTiler => 22,
            TileProvider::Custom => 22,
        }
    }

    /// All provider variants, in declaration order.
    pub fn all() -> &'static [TileProvider] {
        &[
            TileProvider::OpenStreetMap,
            TileProvider::OpenStreetMapHumanitarian,
            TileProvider::CartoDbVoyager,
            TileProvider::CartoDbPositron,
            TileProvider::CartoDbDarkMatter,
            TileProvider::StamenToner,
            TileProvider::StamenTerrain,
            TileProvider::StamenWatercolor,
            TileProvider::EsriWorldImagery,
            TileProvider::EsriWorldStreetMap,
            TileProvider::EsriWorldTopoMap,
            TileProvider::OpenTopoMap,
            TileProvider::Mapbox,
            TileProvider::GoogleMaps,
            TileProvider::MapTiler,
            TileProvider::Custom,
        ]
    }
}

impl FromStr for TileProvider {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        TileProvider::all()
            .iter()
            .find(|p| p.name() == normalized)
            .copied()
            .ok_or_else(|| ProviderError::UnknownProvider(s.to_string()))
    }
}

/// Generic map style, translated to provider-specific identifiers by the
/// URL resolver's per-provider style tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapStyle {
    Streets,
    Satellite,
    Hybrid,
    Dark,
    Light,
    Terrain,
}

impl MapStyle {
    /// Style name used in configuration files and cache keys.
    pub fn name(&self) -> &'static str {
        match self {
            MapStyle::Streets => "streets",
            MapStyle::Satellite => "satellite",
            MapStyle::Hybrid => "hybrid",
            MapStyle::Dark => "dark",
            MapStyle::Light => "light",
            MapStyle::Terrain => "terrain",
        }
    }

    /// All style variants.
    pub fn all() -> &'static [MapStyle] {
        &[
            MapStyle::Streets,
            MapStyle::Satellite,
            MapStyle::Hybrid,
            MapStyle::Dark,
            MapStyle::Light,
            MapStyle::Terrain,
        ]
    }
}

impl FromStr for MapStyle {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        MapStyle::all()
            .iter()
            .find(|style| style.name() == normalized)
            .copied()
            .ok_or_else(|| ProviderError::UnknownStyle(s.to_string()))
    }
}

/// The active provider configuration.
///
/// Holds everything the URL resolver needs: which provider and style are
/// selected, the expected tile raster size, per-provider credentials, and
/// the template string for the `Custom` provider. Changing `provider` or
/// `style` makes previously cached tiles invalid; the service layer
/// enforces that by clearing the cache.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Active tile provider.
    pub provider: TileProvider,

    /// Active map style.
    pub style: MapStyle,

    /// Tile raster size in pixels (commonly 256 or 512).
    pub tile_size: u32,

    /// Mapbox access token.
    pub mapbox_api_key: String,

    /// Google Maps Platform API key.
    pub google_api_key: String,

    /// MapTiler Cloud API key.
    pub maptiler_api_key: String,

    /// Template for the `Custom` provider.
    pub custom_url_template: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: TileProvider::OpenStreetMap,
            style: MapStyle::Streets,
            tile_size: 256,
            mapbox_api_key: String::new(),
            google_api_key: String::new(),
            maptiler_api_key: String::new(),
            custom_url_template: String::new(),
        }
    }
}

impl ProviderConfig {
    /// Creates a configuration for the given provider with default style.
    pub fn new(provider: TileProvider) -> Self {
        Self {
            provider,
            ..Self::default()
        }
    }

    /// Sets the style.
    pub fn with_style(mut self, style: MapStyle) -> Self {
        self.style = style;
        self
    }

    /// Sets the credential for the currently selected provider.
    ///
    /// Ignored (with a debug log) for providers that take no credential.
    pub fn set_api_key(&mut self, key: impl Into<String>) {
        let key = key.into();
        match self.provider {
            TileProvider::Mapbox => self.mapbox_api_key = key,
            TileProvider::GoogleMaps => self.google_api_key = key,
            TileProvider::MapTiler => self.maptiler_api_key = key,
            other => {
                tracing::debug!(provider = other.name(), "provider takes no API key, ignoring");
            }
        }
    }

    /// Returns the credential for the active provider, if it needs one.
    pub(crate) fn active_api_key(&self) -> Option<&str> {
        match self.provider {
            TileProvider::Mapbox => Some(self.mapbox_api_key.as_str()),
            TileProvider::GoogleMaps => Some(self.google_api_key.as_str()),
            TileProvider::MapTiler => Some(self.maptiler_api_key.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_names_roundtrip() {
        for provider in TileProvider::all() {
            let parsed: TileProvider = provider.name().parse().unwrap();
            assert_eq!(parsed, *provider);
        }
    }

    #[test]
    fn test_style_names_roundtrip() {
        for style in MapStyle::all() {
            let parsed: MapStyle = style.name().parse().unwrap();
            assert_eq!(parsed, *style);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let provider: TileProvider = "Mapbox".parse().unwrap();
        assert_eq!(provider, TileProvider::Mapbox);
        let style: MapStyle = "DARK".parse().unwrap();
        assert_eq!(style, MapStyle::Dark);
    }

    #[test]
    fn test_parse_unknown_provider() {
        let result: Result<TileProvider, _> = "bing".parse();
        assert!(matches!(result, Err(ProviderError::UnknownProvider(_))));
    }

    #[test]
    fn test_credential_requirements() {
        assert!(TileProvider::Mapbox.requires_api_key());
        assert!(TileProvider::GoogleMaps.requires_api_key());
        assert!(TileProvider::MapTiler.requires_api_key());
        assert!(!TileProvider::OpenStreetMap.requires_api_key());
        assert!(!TileProvider::EsriWorldImagery.requires_api_key());
        assert!(!TileProvider::Custom.requires_api_key());
    }

    #[test]
    fn test_set_api_key_targets_active_provider() {
        let mut config = ProviderConfig::new(TileProvider::Mapbox);
        config.set_api_key("pk.secret");
        assert_eq!(config.mapbox_api_key, "pk.secret");
        assert!(config.google_api_key.is_empty());

        config.provider = TileProvider::MapTiler;
        config.set_api_key("mt-key");
        assert_eq!(config.maptiler_api_key, "mt-key");
        // Earlier credential untouched
        assert_eq!(config.mapbox_api_key, "pk.secret");
    }

    #[test]
    fn test_set_api_key_ignored_for_keyless_provider() {
        let mut config = ProviderConfig::new(TileProvider::OpenStreetMap);
        config.set_api_key("whatever");
        assert!(config.mapbox_api_key.is_empty());
        assert!(config.google_api_key.is_empty());
        assert!(config.maptiler_api_key.is_empty());
    }
}
