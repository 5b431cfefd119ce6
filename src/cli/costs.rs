//! Costs command implementation

use super::OutputFormat;
use crate::config::Config;
use crate::cost::{
    compute_adv_volatility, compute_capacity_analysis, compute_cost_summary,
    compute_daily_costs_permno, compute_net_returns, CostModelConfig, ADV_WINDOW_DAYS,
};
use crate::data::{ParquetReader, ParquetWriter, RunSummary};
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct CostsArgs {
    /// Daily position weights (date, permno, weight)
    #[arg(long)]
    pub weights: PathBuf,

    /// Daily gross portfolio returns (date, gross_return)
    #[arg(long)]
    pub returns: PathBuf,

    /// Lagged ADV/volatility table (date, permno, adv_usd, volatility)
    #[arg(long, conflicts_with = "bars")]
    pub adv: Option<PathBuf>,

    /// Daily bars (date, permno, price, volume, ret) to derive ADV/volatility from
    #[arg(long)]
    pub bars: Option<PathBuf>,

    /// Override the configured portfolio value
    #[arg(long)]
    pub portfolio_value: Option<f64>,

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

impl CostsArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let cost_config = self.cost_config(&config.cost_model)?;

        let weights = ParquetReader::new(&self.weights)
            .read_weights()
            .with_context(|| format!("reading weights from {:?}", self.weights))?;
        let gross = ParquetReader::new(&self.returns)
            .read_portfolio_returns()
            .with_context(|| format!("reading portfolio returns from {:?}", self.returns))?;

        let adv = match (&self.adv, &self.bars) {
            (Some(path), _) => ParquetReader::new(path)
                .read_adv_volatility()
                .with_context(|| format!("reading ADV from {:?}", path))?,
            (None, Some(path)) => {
                let bars = ParquetReader::new(path)
                    .read_daily_bars()
                    .with_context(|| format!("reading daily bars from {:?}", path))?;
                compute_adv_volatility(&bars, ADV_WINDOW_DAYS)
            }
            (None, None) => {
                tracing::warn!("No ADV/volatility input; every trade uses the fallback floors");
                Vec::new()
            }
        };
        tracing::info!(
            weights = weights.len(),
            returns = gross.len(),
            adv = adv.len(),
            "Loaded cost inputs"
        );

        let costs = compute_daily_costs_permno(&weights, &adv, &cost_config);
        let net = compute_net_returns(&gross, &costs.cost_drag);
        let summary = compute_cost_summary(&net, &costs.trades);
        let capacity = compute_capacity_analysis(&weights, &costs.trades, &summary, &cost_config);

        let output_dir = self
            .output
            .clone()
            .unwrap_or_else(|| config.data.output_dir.clone());
        let writer = ParquetWriter::new(&output_dir);
        writer.write_net_returns(&net)?;
        writer.write_portfolio_returns(&gross)?;
        let run = RunSummary::new(self.snapshot_id.clone())
            .with_costs(&summary, &capacity, &cost_config)
            .with_extra("diagnostics", serde_json::to_value(&costs.diagnostics)?);
        run.write(&output_dir)?;

        match self.format {
            OutputFormat::Table => {
                println!("{}", summary.format_table());
                println!("{}", capacity.format_table());
                println!(
                    "Fallbacks: ADV {}  volatility {}  participation violations {}",
                    costs.diagnostics.adv_fallback_count,
                    costs.diagnostics.volatility_fallback_count,
                    costs.diagnostics.participation_violations
                );
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&run)?),
        }
        Ok(())
    }

    fn cost_config(&self, base: &CostModelConfig) -> anyhow::Result<CostModelConfig> {
        let Some(value) = self.portfolio_value else {
            return Ok(base.clone());
        };
        let config = CostModelConfig::new(
            base.bps_per_trade(),
            base.impact_coefficient(),
            base.participation_limit(),
            value,
        )?
        .with_enabled(base.enabled())
        .with_adv_source(base.adv_source());
        Ok(config)
    }
}
