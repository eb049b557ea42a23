//! Tile URL resolution.
//!
//! Maps an (active provider, style, tile coordinate) triple to a concrete
//! fetchable URL. Each provider has exactly one template, parameterized by
//! zoom/x/y and, where the CDN supports it, a load-balancing subdomain
//! chosen deterministically from the tile coordinate so repeat lookups hit
//! the same edge cache.

use crate::coord::{tile_center, TileCoord};
use crate::provider::{MapStyle, ProviderConfig, ProviderError, TileProvider};

/// Subdomain rotation used by OSM-style CDNs.
const SUBDOMAINS: [char; 3] = ['a', 'b', 'c'];

/// Picks the load-balancing subdomain for a tile.
///
/// `(x + y) mod 3` keeps the choice stable per tile across sessions.
fn subdomain_for(tile: &TileCoord) -> char {
    SUBDOMAINS[((tile.x() as u64 + tile.y() as u64) % 3) as usize]
}

/// CartoDB basemap identifier for a provider variant and style.
///
/// The variant fixes the default; Dark/Light override it so style switches
/// behave uniformly across providers.
fn carto_basemap(provider: TileProvider, style: MapStyle) -> &'static str {
    match style {
        MapStyle::Dark => "dark_all",
        MapStyle::Light => "light_all",
        _ => match provider {
            TileProvider::CartoDbPositron => "light_all",
            TileProvider::CartoDbDarkMatter => "dark_all",
            _ => "rastertiles/voyager",
        },
    }
}

/// Stamen layer identifier and raster extension for a provider variant.
fn stamen_layer(provider: TileProvider) -> (&'static str, &'static str) {
    match provider {
        TileProvider::StamenTerrain => ("terrain", "png"),
        TileProvider::StamenWatercolor => ("watercolor", "jpg"),
        _ => ("toner", "png"),
    }
}

/// Esri MapServer service name for a provider variant.
fn esri_service(provider: TileProvider) -> &'static str {
    match provider {
        TileProvider::EsriWorldStreetMap => "World_Street_Map",
        TileProvider::EsriWorldTopoMap => "World_Topo_Map",
        _ => "World_Imagery",
    }
}

/// Mapbox style identifier for a generic style.
fn mapbox_style(style: MapStyle) -> &'static str {
    match style {
        MapStyle::Streets => "streets-v12",
        MapStyle::Satellite => "satellite-v9",
        MapStyle::Hybrid => "satellite-streets-v12",
        MapStyle::Dark => "dark-v11",
        MapStyle::Light => "light-v11",
        MapStyle::Terrain => "outdoors-v12",
    }
}

/// MapTiler map identifier for a generic style.
fn maptiler_style(style: MapStyle) -> &'static str {
    match style {
        MapStyle::Streets => "streets-v2",
        MapStyle::Satellite => "satellite",
        MapStyle::Hybrid => "hybrid",
        MapStyle::Dark => "streets-v2-dark",
        MapStyle::Light => "streets-v2-light",
        MapStyle::Terrain => "topo-v2",
    }
}

/// Google Static Maps map type for a generic style.
fn google_maptype(style: MapStyle) -> &'static str {
    match style {
        MapStyle::Satellite => "satellite",
        MapStyle::Hybrid => "hybrid",
        MapStyle::Terrain => "terrain",
        _ => "roadmap",
    }
}

/// Resolves the fetchable URL for a tile under the given configuration.
///
/// Providers that require credentials return
/// [`ProviderError::MissingApiKey`] when the configured key is empty; the
/// fetch layer treats this as an immediate, non-retryable failure rather
/// than a network error.
pub fn resolve_url(config: &ProviderConfig, tile: &TileCoord) -> Result<String, ProviderError> {
    if config.provider.requires_api_key() {
        match config.active_api_key() {
            Some(key) if !key.is_empty() => {}
            _ => return Err(ProviderError::MissingApiKey(config.provider.name())),
        }
    }

    let (x, y, z) = (tile.x(), tile.y(), tile.zoom());
    let s = subdomain_for(tile);

    let url = match config.provider {
        TileProvider::OpenStreetMap => {
            format!("https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png")
        }
        TileProvider::OpenStreetMapHumanitarian => {
            format!("https://{s}.tile.openstreetmap.fr/hot/{z}/{x}/{y}.png")
        }
        TileProvider::CartoDbVoyager
        | TileProvider::CartoDbPositron
        | TileProvider::CartoDbDarkMatter => {
            let basemap = carto_basemap(config.provider, config.style);
            format!("https://{s}.basemaps.cartocdn.com/{basemap}/{z}/{x}/{y}.png")
        }
        TileProvider::StamenToner | TileProvider::StamenTerrain | TileProvider::StamenWatercolor => {
            let (layer, ext) = stamen_layer(config.provider);
            format!("https://stamen-tiles-{s}.a.ssl.fastly.net/{layer}/{z}/{x}/{y}.{ext}")
        }
        TileProvider::EsriWorldImagery
        | TileProvider::EsriWorldStreetMap
        | TileProvider::EsriWorldTopoMap => {
            let service = esri_service(config.provider);
            // Esri path order is {z}/{y}/{x}, row before column
            format!(
                "https://server.arcgisonline.com/ArcGIS/rest/services/{service}/MapServer/tile/{z}/{y}/{x}"
            )
        }
        TileProvider::OpenTopoMap => {
            format!("https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png")
        }
        TileProvider::Mapbox => {
            let style = mapbox_style(config.style);
            let size = config.tile_size;
            let key = &config.mapbox_api_key;
            format!(
                "https://api.mapbox.com/styles/v1/mapbox/{style}/tiles/{size}/{z}/{x}/{y}@2x?access_token={key}"
            )
        }
        TileProvider::GoogleMaps => {
            // Google's Static Maps API is center-addressed, not
            // tile-addressed; center the request on the tile's midpoint.
            let center = tile_center(tile);
            let maptype = google_maptype(config.style);
            let size = config.tile_size;
            let key = &config.google_api_key;
            format!(
                "https://maps.googleapis.com/maps/api/staticmap?center={:.6},{:.6}&zoom={z}&size={size}x{size}&maptype={maptype}&key={key}",
                center.lat, center.lon
            )
        }
        TileProvider::MapTiler => {
            let style = maptiler_style(config.style);
            let key = &config.maptiler_api_key;
            format!("https://api.maptiler.com/maps/{style}/{z}/{x}/{y}.png?key={key}")
        }
        TileProvider::Custom => return resolve_custom(config, tile, s),
    };

    Ok(url)
}

/// Substitutes `{x}`, `{y}`, `{z}`/`{zoom}`, `{s}` into a user template.
fn resolve_custom(
    config: &ProviderConfig,
    tile: &TileCoord,
    subdomain: char,
) -> Result<String, ProviderError> {
    let template = config.custom_url_template.trim();
    if template.is_empty() {
        return Err(ProviderError::InvalidCustomTemplate(
            "template is empty".to_string(),
        ));
    }
    let has_zoom = template.contains("{z}") || template.contains("{zoom}");
    if !template.contains("{x}") || !template.contains("{y}") || !has_zoom {
        return Err(ProviderError::InvalidCustomTemplate(format!(
            "template must contain {{x}}, {{y}} and {{z}} placeholders: {template}"
        )));
    }

    Ok(template
        .replace("{zoom}", &tile.zoom().to_string())
        .replace("{z}", &tile.zoom().to_string())
        .replace("{x}", &tile.x().to_string())
        .replace("{y}", &tile.y().to_string())
        .replace("{s}", &subdomain.to_string()))
}
