//! appman - application manifest client

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use appman_cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    appman_cli::run(&cli)
}
