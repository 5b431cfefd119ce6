//! Quantile analysis configuration, results and errors

use crate::config::ConfigError;
use crate::returns::{validate_window, ForwardReturnsError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Quantile analysis errors
#[derive(Debug, Error)]
pub enum QuantileError {
    /// Not enough usable data; the caller may widen the window or universe
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Returns(#[from] ForwardReturnsError),
}

/// Quantile / Rank-IC analysis parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuantileAnalysisConfigRaw")]
pub struct QuantileAnalysisConfig {
    n_quantiles: usize,
    holding_period_days: usize,
    min_observations_per_date: usize,
    min_total_dates: usize,
    skip_days: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct QuantileAnalysisConfigRaw {
    #[serde(default = "default_n_quantiles")]
    n_quantiles: usize,
    #[serde(default = "default_holding_period")]
    holding_period_days: usize,
    #[serde(default = "default_min_observations")]
    min_observations_per_date: usize,
    #[serde(default = "default_min_total_dates")]
    min_total_dates: usize,
    #[serde(default = "default_skip_days")]
    skip_days: usize,
}

fn default_n_quantiles() -> usize {
    5
}
fn default_holding_period() -> usize {
    20
}
fn default_min_observations() -> usize {
    20
}
fn default_min_total_dates() -> usize {
    10
}
fn default_skip_days() -> usize {
    1
}

impl TryFrom<QuantileAnalysisConfigRaw> for QuantileAnalysisConfig {
    type Error = ConfigError;

    fn try_from(raw: QuantileAnalysisConfigRaw) -> Result<Self, Self::Error> {
        Self::new(
            raw.n_quantiles,
            raw.holding_period_days,
            raw.min_observations_per_date,
            raw.min_total_dates,
            raw.skip_days,
        )
    }
}

impl QuantileAnalysisConfig {
    pub fn new(
        n_quantiles: usize,
        holding_period_days: usize,
        min_observations_per_date: usize,
        min_total_dates: usize,
        skip_days: usize,
    ) -> Result<Self, ConfigError> {
        if n_quantiles < 2 {
            return Err(ConfigError::out_of_range(
                "n_quantiles",
                format!("must be >= 2, got {n_quantiles}"),
            ));
        }
        validate_window(skip_days, holding_period_days)?;
        if min_observations_per_date < n_quantiles {
            return Err(ConfigError::out_of_range(
                "min_observations_per_date",
                format!("must be >= n_quantiles ({n_quantiles}), got {min_observations_per_date}"),
            ));
        }
        if min_total_dates == 0 {
            return Err(ConfigError::out_of_range("min_total_dates", "must be >= 1"));
        }

        Ok(Self {
            n_quantiles,
            holding_period_days,
            min_observations_per_date,
            min_total_dates,
            skip_days,
        })
    }

    pub fn n_quantiles(&self) -> usize {
        self.n_quantiles
    }

    pub fn holding_period_days(&self) -> usize {
        self.holding_period_days
    }

    pub fn min_observations_per_date(&self) -> usize {
        self.min_observations_per_date
    }

    pub fn min_total_dates(&self) -> usize {
        self.min_total_dates
    }

    pub fn skip_days(&self) -> usize {
        self.skip_days
    }
}

impl Default for QuantileAnalysisConfig {
    fn default() -> Self {
        Self {
            n_quantiles: default_n_quantiles(),
            holding_period_days: default_holding_period(),
            min_observations_per_date: default_min_observations(),
            min_total_dates: default_min_total_dates(),
            skip_days: default_skip_days(),
        }
    }
}

/// Rank IC for one date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyIc {
    pub date: NaiveDate,
    pub rank_ic: f64,
    pub n_obs: usize,
}

/// Aggregate Rank-IC and quantile-return profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantileResult {
    pub mean_rank_ic: f64,
    pub rank_ic_std: f64,
    pub rank_ic_t_stat: f64,
    /// Percent of dates with a positive IC (0-100)
    pub rank_ic_positive_pct: f64,
    /// mean / std of the daily IC; `None` with fewer than 2 dates or zero std
    pub icir: Option<f64>,
    /// Two-sided p-value of the t statistic (Student-t, n-1 dof)
    pub rank_ic_p_value: Option<f64>,
    /// Mean forward return per quantile, 1 = lowest signal
    pub quantile_returns: BTreeMap<usize, f64>,
    /// Top quantile minus bottom quantile
    pub long_short_spread: Option<f64>,
    pub n_dates: usize,
    pub n_dates_skipped: usize,
    pub n_observations_per_quantile: BTreeMap<usize, usize>,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub signal_name: String,
    pub universe_name: String,
    pub daily_ic: Vec<DailyIc>,
}

impl QuantileResult {
    /// Format as table for CLI output
    pub fn format_table(&self) -> String {
        let mut quantiles = String::new();
        for (q, ret) in &self.quantile_returns {
            let count = self.n_observations_per_quantile.get(q).copied().unwrap_or(0);
            quantiles.push_str(&format!(
                "Q{:<2}              {:+.4}%  (n={})\n",
                q,
                ret * 100.0,
                count
            ));
        }

        format!(
            r#"
══════════════════════════════════════════════════════
               RANK IC ANALYSIS
══════════════════════════════════════════════════════
Signal:           {}
Universe:         {}
Period:           {} to {}

RANK IC
───────────────────────────────────────────────────────
Mean IC:          {:.4}
IC Std:           {:.4}
ICIR:             {}
t-stat:           {:.2}
p-value:          {}
Positive:         {:.1}%
Dates:            {} ({} skipped)

QUANTILE RETURNS
───────────────────────────────────────────────────────
{}Long-Short:       {}
══════════════════════════════════════════════════════
"#,
            self.signal_name,
            self.universe_name,
            self.period_start,
            self.period_end,
            self.mean_rank_ic,
            self.rank_ic_std,
            crate::cost::fmt_num(self.icir),
            self.rank_ic_t_stat,
            self.rank_ic_p_value
                .map_or_else(|| "n/a".to_string(), |p| format!("{:.4}", p)),
            self.rank_ic_positive_pct,
            self.n_dates,
            self.n_dates_skipped,
            quantiles,
            crate::cost::fmt_pct(self.long_short_spread),
        )
    }
}
