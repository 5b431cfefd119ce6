//! CLI interface for pit-analytics
//!
//! Provides subcommands for:
//! - `costs`: Transaction costs, net returns and capacity for a weight history
//! - `quantile`: Rank-IC and quantile report for a signal
//! - `windows`: Walk-forward train/test windows for a date range
//! - `config`: Show effective configuration

mod costs;
mod quantile;
mod windows;

pub use costs::CostsArgs;
pub use quantile::QuantileArgs;
pub use windows::WindowsArgs;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "pit-analytics")]
#[command(about = "Point-in-time equity analytics: costs, Rank-IC validation, walk-forward windows")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,

    /// Print Prometheus metrics recorded during the command
    #[arg(long, global = true)]
    pub print_metrics: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply the cost model to a weight history
    Costs(CostsArgs),
    /// Rank-IC and quantile analysis of a signal
    Quantile(QuantileArgs),
    /// Print walk-forward windows
    Windows(WindowsArgs),
    /// Show configuration
    Config,
}

/// Report output format
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}
