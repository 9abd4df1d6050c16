mod bundle;
mod cli;
mod cmd;
mod command;
mod config;
mod docker;
mod host;
mod logger;
mod proxy;
mod spinner;
mod ui;

use anyhow::Result;
use tracing::{error, info};

fn main() -> Result<()> {
    match cli::run() {
        Ok(result) => {
            info!("sandboxctl finished successfully");
            Ok(result)
        }
        Err(err) => {
            error!(error = ?err, "sandboxctl failed");
            Err(err)
        }
    }
}
