//! # jobwatch entry point

use anyhow::{Context, Result};
use clap::Parser;
use jobwatch::{cli::Cli, config::ConfigLoader, telemetry::init_tracing};
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration from layered env files and variables
    let mut config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    cli.apply_overrides(&mut config);
    config.validate().context("validating configuration")?;

    if let Err(err) = init_tracing(&config) {
        eprintln!("Warning: failed to initialize tracing: {err}");
    }

    if let Ok(redacted) = config.redacted_json() {
        debug!(profile = %config.profile, config = %redacted, "configuration loaded");
    }

    jobwatch::cli::execute(cli, config).await
}
