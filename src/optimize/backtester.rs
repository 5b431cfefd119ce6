//! Backtester contract consumed by parameter search and walk-forward

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::SearchError;

/// Errors reported by a backtester implementation
#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("unknown snapshot: {0}")]
    UnknownSnapshot(String),
    #[error("backtest failed: {0}")]
    Failed(String),
}

/// Signal-quality metrics of one backtest run
///
/// `None` marks a metric the run could not determine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub mean_ic: Option<f64>,
    pub icir: Option<f64>,
    pub hit_rate: Option<f64>,
    pub coverage: Option<f64>,
}

impl BacktestMetrics {
    /// Value of `metric`, NaN when missing
    pub fn score(&self, metric: SearchMetric) -> f64 {
        let value = match metric {
            SearchMetric::MeanIc => self.mean_ic,
            SearchMetric::Icir => self.icir,
            SearchMetric::HitRate => self.hit_rate,
        };
        value.unwrap_or(f64::NAN)
    }
}

/// Metric used to rank parameter candidates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMetric {
    #[default]
    MeanIc,
    Icir,
    HitRate,
}

impl fmt::Display for SearchMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchMetric::MeanIc => "mean_ic",
            SearchMetric::Icir => "icir",
            SearchMetric::HitRate => "hit_rate",
        };
        f.write_str(name)
    }
}

impl FromStr for SearchMetric {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mean_ic" => Ok(SearchMetric::MeanIc),
            "icir" => Ok(SearchMetric::Icir),
            "hit_rate" => Ok(SearchMetric::HitRate),
            other => Err(SearchError::UnsupportedMetric(other.to_string())),
        }
    }
}

/// Point-in-time backtest engine
///
/// Two runs with the same `snapshot_id` must read identical historical data
/// regardless of when they execute.
pub trait Backtester {
    /// Alpha definition built from a parameter set
    type Alpha;

    fn run_backtest(
        &self,
        alpha: &Self::Alpha,
        start: NaiveDate,
        end: NaiveDate,
        snapshot_id: Option<&str>,
    ) -> Result<BacktestMetrics, BacktestError>;

    /// Most recent dataset snapshot, if the engine versions its data
    fn latest_snapshot_id(&self) -> Option<String> {
        None
    }
}

impl<B: Backtester + ?Sized> Backtester for &B {
    type Alpha = B::Alpha;

    fn run_backtest(
        &self,
        alpha: &Self::Alpha,
        start: NaiveDate,
        end: NaiveDate,
        snapshot_id: Option<&str>,
    ) -> Result<BacktestMetrics, BacktestError> {
        (**self).run_backtest(alpha, start, end, snapshot_id)
    }

    fn latest_snapshot_id(&self) -> Option<String> {
        (**self).latest_snapshot_id()
    }
}
