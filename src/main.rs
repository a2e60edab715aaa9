//! WMS tile fetcher CLI application
//!
//! Fetches map tiles concurrently from a WMS server into a
//! `<output>/<zoom>/<column>/<row>.<ext>` tree and prints a one-line
//! summary of the run.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use wms_fetcher::cli::{handle_fetch, Cli};
use wms_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(&cli);

    info!("wms_fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    handle_fetch(&cli.fetch, cli.global.quiet).await?;

    Ok(())
}

/// Initialize logging based on CLI verbosity settings
fn init_logging(cli: &Cli) {
    let log_level = cli.log_level();

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("wms_fetcher={}", log_level).parse().unwrap());

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
