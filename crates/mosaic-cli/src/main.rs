//! `mosaic` - merge georeferenced rasters into one GeoTIFF.

use clap::Parser;
use mosaic_cli::{logging, run, Cli};
use mosaic_engine::{CancelFlag, GeoTiffIo};
use std::io;
use std::process;
use tracing::warn;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(cli.verbose) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
    mosaic_metrics::describe_metrics();

    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("Cancelling after the current source...");
        handler_flag.cancel();
    }) {
        warn!(error = %e, "could not install Ctrl-C handler");
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = run(&GeoTiffIo::new(), &cli, &cancel, &mut out) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
