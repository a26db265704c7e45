//! drivestream agent entry point.

mod app;
mod config;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting drivestream agent"
    );

    let config = config::Config::load(args.config.as_deref())?;
    tracing::info!(upload_dir = %config.upload_dir, "configuration loaded");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config, args.files))?;

    Ok(())
}

/// Streams local files into the upload folder.
#[derive(Parser, Debug)]
#[command(name = "drivestream-agent", version, about)]
struct Args {
    /// Configuration file (defaults to the platform config path).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Files to upload.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}
