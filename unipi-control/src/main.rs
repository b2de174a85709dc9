//! `unipi-control` — MQTT/Modbus bridge daemon entry point (§6, §7).

mod cli;
mod error;
mod lifecycle;
mod logging;
mod scan;

use clap::Parser;

use crate::cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.log);

    match lifecycle::run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            log::error!("{} {err}", err.log_prefix());
            std::process::exit(1);
        }
    }
}
