//! `fetch` command: download a single tile through the full service stack.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tokio::sync::oneshot;
use tracing::info;

use tilestream::coord::tile_for_coord;
use tilestream::service::TileService;

use crate::commands::common::{build_service_config, ProviderArg, StyleArg};
use crate::error::CliError;

/// Arguments for `tilestream fetch`.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Latitude in degrees
    pub lat: f64,

    /// Longitude in degrees
    pub lon: f64,

    /// Zoom level
    pub zoom: u8,

    /// Tile provider (defaults to the configured one)
    #[arg(long, value_enum)]
    pub provider: Option<ProviderArg>,

    /// Map style (defaults to the configured one)
    #[arg(long, value_enum)]
    pub style: Option<StyleArg>,

    /// API key for providers that require one
    #[arg(long)]
    pub api_key: Option<String>,

    /// Output file (PNG)
    #[arg(short, long, default_value = "tile.png")]
    pub output: PathBuf,
}

/// Fetches one tile and writes it to disk as PNG.
pub fn run(args: FetchArgs) -> Result<(), CliError> {
    let config = build_service_config(args.provider, args.style, args.api_key)?;
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async {
        let service = Arc::new(TileService::new(config)?);
        let tile = tile_for_coord(args.lat, args.lon, args.zoom)?;
        info!(tile = %tile, "fetching");

        let (tx, rx) = oneshot::channel();
        service.get_tile_async(&tile, move |cached| {
            let _ = tx.send(cached.clone());
        });
        let cached = rx
            .await
            .map_err(|_| CliError::Fetch("fetch was cancelled".to_string()))?;

        if cached.failed {
            let reason = cached
                .failure
                .map(|f| f.to_string())
                .unwrap_or_else(|| "unknown failure".to_string());
            return Err(CliError::Fetch(reason));
        }

        let image = cached
            .image
            .ok_or_else(|| CliError::Fetch("completed without image data".to_string()))?;
        let raster = image::RgbaImage::from_raw(
            image.width(),
            image.height(),
            image.pixels().to_vec(),
        )
        .ok_or_else(|| CliError::Fetch("decoded buffer has wrong dimensions".to_string()))?;
        raster
            .save(&args.output)
            .map_err(|e| CliError::Fetch(format!("failed to write {}: {e}", args.output.display())))?;

        println!(
            "{} ({}x{}) -> {}",
            tile,
            image.width(),
            image.height(),
            args.output.display()
        );
        Ok(())
    })
}
