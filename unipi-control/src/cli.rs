//! Command-line surface (§6): `-c/--config`, `-l/--log`, repeatable `-v`,
//! `--version`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Systemd,
    Stdout,
}

#[derive(Debug, Parser)]
#[command(name = "unipi-control", version, about = "MQTT/Modbus bridge daemon for Unipi PLCs")]
pub struct Cli {
    /// Directory containing control.yaml and the hardware/ subtree.
    #[arg(short, long, default_value = "/etc/unipi")]
    pub config: PathBuf,

    #[arg(short, long, value_enum, default_value = "stdout")]
    pub log: LogTarget,

    /// Raises log verbosity; repeatable (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
