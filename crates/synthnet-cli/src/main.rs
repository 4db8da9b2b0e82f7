//! # synthnet - build and wire lattice neuron networks from the command line

use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use synthnet_cli::{CliResult, SynthnetCli};

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = SynthnetCli::parse();

    // RUST_LOG wins over --verbose, which wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.default_log_level()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(err) = cli.execute().await {
        error!("Command failed: {}", err);
        std::process::exit(1);
    }

    Ok(())
}
