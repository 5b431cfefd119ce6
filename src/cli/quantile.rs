//! Quantile command implementation

use super::OutputFormat;
use crate::config::Config;
use crate::data::{ParquetReader, ParquetWriter, RunSummary};
use crate::quantile::run_quantile_analysis;
use crate::returns::{ForwardReturnsProvider, InMemoryReturns};
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct QuantileArgs {
    /// Signal table (signal_date or date, permno, signal_value)
    #[arg(long)]
    pub signals: PathBuf,

    /// Daily stock returns (date, permno, ret)
    #[arg(long)]
    pub returns: PathBuf,

    /// Signal name for the report
    #[arg(long, default_value = "signal")]
    pub signal_name: String,

    /// Universe name for the report
    #[arg(long, default_value = "universe")]
    pub universe: String,

    /// Snapshot the inputs were read from
    #[arg(long)]
    pub snapshot_id: Option<String>,

    /// Output directory for results (defaults to data.output_dir)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl QuantileArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let signals = ParquetReader::new(&self.signals)
            .read_signals()
            .with_context(|| format!("reading signals from {:?}", self.signals))?;
        let daily = ParquetReader::new(&self.returns)
            .read_daily_returns()
            .with_context(|| format!("reading daily returns from {:?}", self.returns))?;
        tracing::info!(signals = signals.len(), returns = daily.len(), "Loaded quantile inputs");

        let calendar = config.calendar.build_for_returns(daily.iter().map(|r| r.date));
        tracing::info!(sessions = calendar.len(), source = ?config.calendar.sessions, "Trading calendar ready");
        let provider = ForwardReturnsProvider::new(Arc::new(calendar), InMemoryReturns::new(daily));
        let result = run_quantile_analysis(
            &signals,
            &provider,
            &config.quantile,
            &self.signal_name,
            &self.universe,
        )?;

        let output_dir = self
            .output
            .clone()
            .unwrap_or_else(|| config.data.output_dir.clone());
        ParquetWriter::new(&output_dir).write_daily_ic(&result.daily_ic)?;
        let headline = serde_json::json!({
            "signal_name": result.signal_name,
            "universe_name": result.universe_name,
            "mean_rank_ic": result.mean_rank_ic,
            "rank_ic_t_stat": result.rank_ic_t_stat,
            "icir": result.icir,
            "rank_ic_p_value": result.rank_ic_p_value,
            "long_short_spread": result.long_short_spread,
            "n_dates": result.n_dates,
            "n_dates_skipped": result.n_dates_skipped,
        });
        RunSummary::new(self.snapshot_id.clone())
            .with_extra("quantile", headline)
            .write(&output_dir)?;

        match self.format {
            OutputFormat::Table => println!("{}", result.format_table()),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        }
        Ok(())
    }
}
