//! Folio - photo portfolio manager
//!
//! Main entry point for the `folio` command line tool.

mod app;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    // Initialize logging and panic hook first
    folio_log::init()?;

    // Clean up old logs (7 days)
    if let Err(e) = folio_log::cleanup_old_logs(7) {
        tracing::warn!("Failed to cleanup old logs: {}", e);
    }

    let cli = app::Cli::parse();
    tracing::info!("folio starting: {:?}", cli.command);

    // Load configuration
    let config = match &cli.config {
        Some(path) => folio_core::FolioConfig::load_from(path)?,
        None => folio_core::FolioConfig::load().unwrap_or_default(),
    };

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(app::run(cli, config))
}
