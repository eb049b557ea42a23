//! Tilestream CLI - command-line interface
//!
//! Exercises the tilestream library end to end: coordinate math, single
//! tile fetches, area preloading, and configuration management.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::config::ConfigCommands;
use commands::fetch::FetchArgs;
use commands::locate::LocateArgs;
use commands::preload::PreloadArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "tilestream", version, about = "Map tile fetching and caching")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show the tile address and projection details for a point
    Locate(LocateArgs),

    /// Fetch one tile and write it to disk
    Fetch(FetchArgs),

    /// Warm the cache over a geographic area
    Preload(PreloadArgs),

    /// View or modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Locate(args) => commands::locate::run(args),
        Commands::Fetch(args) => commands::fetch::run(args),
        Commands::Preload(args) => commands::preload::run(args),
        Commands::Config { command } => commands::config::run(command),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
