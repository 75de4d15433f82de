//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use log::{info, warn};
use trailhead_cli::ExportReport;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match trailhead_cli::run().await {
        Ok(ExportReport::Skipped) => info!("no changes detected; nothing exported"),
        Ok(ExportReport::Checked { rebuild }) => println!("{rebuild}"),
        Ok(ExportReport::Tenant { key }) => info!("published {key}"),
        Ok(ExportReport::Batch { published, failed }) => {
            info!("published {published} snapshots");
            if failed > 0 {
                warn!("{failed} tenant exports failed");
                std::process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("trailhead: {err}");
            std::process::exit(1);
        }
    }
}
