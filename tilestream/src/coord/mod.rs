//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude),
//! pixel space, and Web Mercator tile coordinates used by slippy-map tile
//! providers.

mod types;

pub use types::{
    CoordError, GeoBounds, GeoCoord, TileCoord, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON,
    MIN_ZOOM,
};

use std::f64::consts::PI;

/// Mean Earth radius in meters (WGS84).
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Earth circumference at the equator in meters.
const EARTH_CIRCUMFERENCE_M: f64 = 2.0 * PI * EARTH_RADIUS_M;

/// Converts geographic coordinates to a tile coordinate.
///
/// Latitude is clamped into the Web Mercator range (±85.05112878°) before
/// projecting, so poles map to the outermost tile row rather than erroring.
/// Longitude outside [-180, 180], non-finite inputs, and unsupported zoom
/// levels are rejected.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-90.0 to 90.0)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 22)
pub fn tile_for_coord(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !lon.is_finite() || !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    // tan/asinh are singular at the poles; clamp to the projection limit
    let lat = lat.clamp(MIN_LAT, MAX_LAT);

    let n = 2.0_f64.powi(zoom as i32);
    let max_index = (1u32 << zoom) - 1;

    let x = (((lon + 180.0) / 360.0 * n) as u32).min(max_index);

    let lat_rad = lat * PI / 180.0;
    let y = ((((1.0 - lat_rad.tan().asinh() / PI) / 2.0) * n) as u32).min(max_index);

    TileCoord::new(x, y, zoom)
}

/// Returns the geographic coordinate of a tile's northwest corner.
pub fn tile_north_west(tile: &TileCoord) -> GeoCoord {
    let n = 2.0_f64.powi(tile.zoom() as i32);
    let lon = tile.x() as f64 / n * 360.0 - 180.0;
    let y = tile.y() as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    GeoCoord::new(lat_rad * 180.0 / PI, lon)
}

/// Returns the geographic coordinate of a tile's center.
pub fn tile_center(tile: &TileCoord) -> GeoCoord {
    let n = 2.0_f64.powi(tile.zoom() as i32);
    let lon = (tile.x() as f64 + 0.5) / n * 360.0 - 180.0;
    let y = (tile.y() as f64 + 0.5) / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    GeoCoord::new(lat_rad * 180.0 / PI, lon)
}

/// Projects a geographic coordinate into global pixel space at the given
/// zoom level and tile size.
///
/// Pixel (0, 0) is the northwest corner of the world; x grows eastward and
/// y grows southward. Latitude is clamped to the projection range.
pub fn coord_to_pixel(lat: f64, lon: f64, zoom: u8, tile_size: u32) -> (f64, f64) {
    let lat = lat.clamp(MIN_LAT, MAX_LAT);
    let world = tile_size as f64 * 2.0_f64.powi(zoom as i32);
    let px = (lon + 180.0) / 360.0 * world;
    let lat_rad = lat * PI / 180.0;
    let py = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * world;
    (px, py)
}

/// Inverse of [`coord_to_pixel`]: converts a global pixel position back to
/// a geographic coordinate.
pub fn pixel_to_coord(px: f64, py: f64, zoom: u8, tile_size: u32) -> GeoCoord {
    let world = tile_size as f64 * 2.0_f64.powi(zoom as i32);
    let lon = px / world * 360.0 - 180.0;
    let lat_rad = (PI * (1.0 - 2.0 * py / world)).sinh().atan();
    GeoCoord::new(lat_rad * 180.0 / PI, lon)
}

/// Ground resolution in meters per pixel at the given latitude and zoom.
///
/// Used by renderers to convert tile raster dimensions into world units.
pub fn meters_per_pixel(lat: f64, zoom: u8, tile_size: u32) -> f64 {
    let lat_rad = lat.clamp(MIN_LAT, MAX_LAT) * PI / 180.0;
    EARTH_CIRCUMFERENCE_M * lat_rad.cos() / (tile_size as f64 * 2.0_f64.powi(zoom as i32))
}

/// Great-circle distance between two geographic points in meters.
pub fn haversine_distance(a: GeoCoord, b: GeoCoord) -> f64 {
    let lat1 = a.lat * PI / 180.0;
    let lat2 = b.lat * PI / 180.0;
    let dlat = (b.lat - a.lat) * PI / 180.0;
    let dlon = (b.lon - a.lon) * PI / 180.0;

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vienna_virginia_at_zoom_15() {
        // Expected indices derive from the projection formula itself; the
        // interesting assertion is that the implementation agrees with a
        // direct evaluation, not a hard-coded pair.
        let (lat, lon, zoom) = (38.9012, -77.2653, 15u8);
        let n = 2.0_f64.powi(zoom as i32);
        let expected_x = ((lon + 180.0) / 360.0 * n) as u32;
        let lat_rad = lat * PI / 180.0;
        let expected_y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n) as u32;

        let tile = tile_for_coord(lat, lon, zoom).unwrap();
        assert_eq!(tile.x(), expected_x);
        assert_eq!(tile.y(), expected_y);

        // Northern-hemisphere, western point: west of center column, north
        // of the center row.
        assert!(tile.x() < 16384);
        assert!(tile.y() < 16384);
    }

    #[test]
    fn test_poles_clamp_instead_of_erroring() {
        let north = tile_for_coord(90.0, 0.0, 10).unwrap();
        assert_eq!(north.y(), 0);

        let south = tile_for_coord(-90.0, 0.0, 10).unwrap();
        assert_eq!(south.y(), 1023);
    }

    #[test]
    fn test_invalid_longitude_rejected() {
        let result = tile_for_coord(0.0, 180.01, 10);
        assert!(matches!(result, Err(CoordError::InvalidLongitude(_))));
    }

    #[test]
    fn test_invalid_latitude_rejected() {
        let result = tile_for_coord(90.5, 0.0, 10);
        assert!(matches!(result, Err(CoordError::InvalidLatitude(_))));
    }

    #[test]
    fn test_nan_rejected() {
        assert!(tile_for_coord(f64::NAN, 0.0, 10).is_err());
        assert!(tile_for_coord(0.0, f64::NAN, 10).is_err());
    }

    #[test]
    fn test_invalid_zoom_rejected() {
        let result = tile_for_coord(0.0, 0.0, 23);
        assert!(matches!(result, Err(CoordError::InvalidZoom(23))));
    }

    #[test]
    fn test_antimeridian_clamps_into_grid() {
        let tile = tile_for_coord(0.0, 180.0, 4).unwrap();
        assert_eq!(tile.x(), 15);
    }

    #[test]
    fn test_center_lies_inside_tile_bounds() {
        let tile = tile_for_coord(51.5074, -0.1278, 12).unwrap();
        let nw = tile_north_west(&tile);
        let next = TileCoord::new(tile.x() + 1, tile.y() + 1, 12).unwrap();
        let se = tile_north_west(&next);
        let center = tile_center(&tile);

        assert!(center.lon > nw.lon && center.lon < se.lon);
        assert!(center.lat < nw.lat && center.lat > se.lat);
    }

    #[test]
    fn test_roundtrip_within_one_tile() {
        let (lat, lon) = (40.7128, -74.0060);
        for zoom in [0u8, 5, 10, 15, 18] {
            let tile = tile_for_coord(lat, lon, zoom).unwrap();
            let back = tile_center(&tile);
            let tile_size_degrees = 360.0 / 2.0_f64.powi(zoom as i32);
            assert!(
                (back.lat - lat).abs() < tile_size_degrees,
                "zoom {}: lat drifted by {}",
                zoom,
                (back.lat - lat).abs()
            );
            assert!(
                (back.lon - lon).abs() < tile_size_degrees,
                "zoom {}: lon drifted by {}",
                zoom,
                (back.lon - lon).abs()
            );
        }
    }

    #[test]
    fn test_pixel_roundtrip() {
        let (px, py) = coord_to_pixel(48.8566, 2.3522, 12, 256);
        let back = pixel_to_coord(px, py, 12, 256);
        assert!((back.lat - 48.8566).abs() < 1e-6);
        assert!((back.lon - 2.3522).abs() < 1e-6);
    }

    #[test]
    fn test_pixel_origin_is_northwest() {
        let origin = pixel_to_coord(0.0, 0.0, 0, 256);
        assert!((origin.lon - (-180.0)).abs() < 1e-9);
        assert!((origin.lat - MAX_LAT).abs() < 1e-6);
    }

    #[test]
    fn test_meters_per_pixel_halves_per_zoom_step() {
        let z10 = meters_per_pixel(0.0, 10, 256);
        let z11 = meters_per_pixel(0.0, 11, 256);
        assert!((z10 / z11 - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_meters_per_pixel_equator_zoom_zero() {
        // Whole world in one 256px tile: ~156.5 km per pixel
        let mpp = meters_per_pixel(0.0, 0, 256);
        assert!((mpp - 156_543.03).abs() < 1.0);
    }

    #[test]
    fn test_haversine_known_distance() {
        // London to Paris, roughly 344 km
        let london = GeoCoord::new(51.5074, -0.1278);
        let paris = GeoCoord::new(48.8566, 2.3522);
        let d = haversine_distance(london, paris);
        assert!((d - 344_000.0).abs() < 5_000.0, "got {}", d);
    }

    #[test]
    fn test_haversine_zero_distance() {
        let p = GeoCoord::new(38.9012, -77.2653);
        assert_eq!(haversine_distance(p, p), 0.0);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_tile_indices_in_bounds(
                lat in -90.0..90.0_f64,
                lon in -180.0..180.0_f64,
                zoom in 0u8..=18
            ) {
                let tile = tile_for_coord(lat, lon, zoom)?;
                let max = 1u32 << zoom;
                prop_assert!(tile.x() < max);
                prop_assert!(tile.y() < max);
                prop_assert_eq!(tile.zoom(), zoom);
            }

            #[test]
            fn test_center_roundtrip_property(
                lat in -85.05..85.05_f64,
                lon in -180.0..180.0_f64,
                zoom in 0u8..=18
            ) {
                let tile = tile_for_coord(lat, lon, zoom)?;
                let back = tile_center(&tile);
                let tile_size = 360.0 / 2.0_f64.powi(zoom as i32);
                prop_assert!((back.lat - lat).abs() < tile_size);
                prop_assert!((back.lon - lon).abs() < tile_size);
            }

            #[test]
            fn test_longitude_monotonic(
                lat in 0.0..1.0_f64,
                lon1 in -180.0..-90.0_f64,
                lon2 in -90.0..0.0_f64,
                zoom in 10u8..=15
            ) {
                let t1 = tile_for_coord(lat, lon1, zoom)?;
                let t2 = tile_for_coord(lat, lon2, zoom)?;
                prop_assert!(t1.x() < t2.x());
            }

            #[test]
            fn test_north_west_in_geographic_bounds(
                x_raw in 0u32..65536,
                y_raw in 0u32..65536,
                zoom in 0u8..=16
            ) {
                let max = 1u32 << zoom;
                let tile = TileCoord::new(x_raw % max, y_raw % max, zoom).unwrap();
                let nw = tile_north_west(&tile);
                prop_assert!(nw.lat >= MIN_LAT && nw.lat <= MAX_LAT);
                prop_assert!(nw.lon >= MIN_LON && nw.lon <= MAX_LON);
            }

            #[test]
            fn test_haversine_non_negative(
                lat1 in -85.0..85.0_f64,
                lon1 in -180.0..180.0_f64,
                lat2 in -85.0..85.0_f64,
                lon2 in -180.0..180.0_f64,
            ) {
                let d = haversine_distance(
                    GeoCoord::new(lat1, lon1),
                    GeoCoord::new(lat2, lon2),
                );
                prop_assert!(d >= 0.0);
                // No two points on Earth are farther apart than half the
                // circumference.
                prop_assert!(d <= EARTH_CIRCUMFERENCE_M / 2.0 + 1.0);
            }
        }
    }
}
