//! `locate` command: coordinate math without any network traffic.

use clap::Args;

use tilestream::coord::{meters_per_pixel, tile_center, tile_for_coord, tile_north_west};

use crate::error::CliError;

/// Arguments for `tilestream locate`.
#[derive(Debug, Args)]
pub struct LocateArgs {
    /// Latitude in degrees
    pub lat: f64,

    /// Longitude in degrees
    pub lon: f64,

    /// Zoom level
    pub zoom: u8,

    /// Tile raster size in pixels
    #[arg(long, default_value_t = 256)]
    pub tile_size: u32,
}

/// Prints the tile address and projection details for a point.
pub fn run(args: LocateArgs) -> Result<(), CliError> {
    let tile = tile_for_coord(args.lat, args.lon, args.zoom)?;
    let center = tile_center(&tile);
    let north_west = tile_north_west(&tile);
    let resolution = meters_per_pixel(args.lat, args.zoom, args.tile_size);

    println!("Tile:        {}/{}/{}", tile.zoom(), tile.x(), tile.y());
    println!("Center:      {center}");
    println!("NW corner:   {north_west}");
    println!("Resolution:  {resolution:.2} m/px at {} px", args.tile_size);

    Ok(())
}
