//! CLI interface for pairwatch
//!
//! Provides subcommands for:
//! - `run`: Scan continuously and post alerts
//! - `scan`: Run a single cycle, optionally without sending
//! - `status`: Show what has been alerted so far
//! - `config`: Show the effective configuration

mod run;
mod scan;
mod status;

pub use run::RunArgs;
pub use scan::ScanArgs;
pub use status::StatusArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "pairwatch")]
#[command(about = "New-pair screener that posts DexScreener listings to Telegram")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan continuously until interrupted
    Run(RunArgs),
    /// Run a single scan cycle
    Scan(ScanArgs),
    /// Show dedup store contents
    Status(StatusArgs),
    /// Show configuration
    Config,
}
