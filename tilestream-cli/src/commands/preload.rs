//! `preload` command: warm the cache over a geographic area.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::error::RecvError;

use tilestream::coord::GeoBounds;
use tilestream::service::TileService;

use crate::commands::common::{build_service_config, ProviderArg, StyleArg};
use crate::error::CliError;

/// How long to wait for any single completion before giving up.
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);

/// Arguments for `tilestream preload`.
#[derive(Debug, Args)]
pub struct PreloadArgs {
    /// Northern bound in degrees
    pub north: f64,

    /// Southern bound in degrees
    pub south: f64,

    /// Eastern bound in degrees
    pub east: f64,

    /// Western bound in degrees
    pub west: f64,

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
}

/// Preloads every tile covering the bounds, with progress reporting.
pub fn run(args: PreloadArgs) -> Result<(), CliError> {
    let config = build_service_config(args.provider, args.style, args.api_key)?;
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async {
        let service = Arc::new(TileService::new(config)?);
        let bounds = GeoBounds::new(args.north, args.south, args.east, args.west);

        // Subscribe before triggering so no completion slips past
        let mut events = service.subscribe();
        let triggered = service.preload_area(&bounds, args.zoom);

        if triggered == 0 {
            println!("Nothing to do: area already cached (or bounds rejected).");
            return Ok(());
        }

        let bar = ProgressBar::new(triggered as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} tiles {msg}")
                .expect("static progress template"),
        );

        let mut completed = 0usize;
        while completed < triggered {
            match tokio::time::timeout(COMPLETION_TIMEOUT, events.recv()).await {
                Ok(Ok(_event)) => {
                    completed += 1;
                    bar.inc(1);
                }
                Ok(Err(RecvError::Lagged(n))) => {
                    completed += n as usize;
                    bar.inc(n);
                }
                Ok(Err(RecvError::Closed)) => break,
                Err(_) => {
                    bar.abandon_with_message("timed out waiting for completions");
                    return Err(CliError::Fetch(
                        "timed out waiting for tile completions".to_string(),
                    ));
                }
            }
        }
        bar.finish();

        let stats = service.stats();
        println!(
            "Preloaded {} tiles (cache: {} resident, {} failed)",
            triggered, stats.count, stats.failed
        );
        Ok(())
    })
}
