//! Command-line interface for Trailhead's snapshot exporter.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod error;
mod export;

pub use error::CliError;
pub use export::ExportReport;

use export::{ExportArgs, run_export};

/// Run the Trailhead CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns [`CliError`] when configuration is incomplete or the export
/// cannot start. Per-tenant batch failures are reported through
/// [`ExportReport::failed`] instead.
pub async fn run() -> Result<ExportReport, CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Export(args) => run_export(args).await,
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "trailhead",
    about = "Per-tenant offline snapshot exporter",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build and publish tenant snapshots.
    Export(ExportArgs),
}

#[cfg(test)]
mod tests;
