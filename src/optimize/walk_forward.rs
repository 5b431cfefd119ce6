//! Walk-forward optimization
//!
//! Rolling train windows are grid-searched, the winning parameters are
//! evaluated on the following test window, and train/test IC are compared
//! to flag overfitting.

use super::backtester::{BacktestMetrics, Backtester, SearchMetric};
use super::params::{ParamGrid, ParamSet};
use super::search::{grid_search, SearchContext, SearchError, SearchResult};
use crate::config::ConfigError;
use crate::telemetry::{
    increment_counter, record_latency, set_gauge, CounterMetric, GaugeMetric, LatencyMetric,
};
use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use thiserror::Error;

/// Absolute tolerance below which a test IC counts as zero
const ZERO_IC_TOLERANCE: f64 = 1e-9;

/// Walk-forward errors
#[derive(Debug, Error)]
pub enum WalkForwardError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("train window {start}..{end} spans {days} days, need at least {min}")]
    TrainWindowTooShort {
        start: NaiveDate,
        end: NaiveDate,
        days: i64,
        min: i64,
    },
    #[error("no complete walk-forward window between {start} and {end}")]
    NoWindows { start: NaiveDate, end: NaiveDate },
    #[error("every parameter combination scored NaN on train window {start}..{end}")]
    AllCandidatesNan { start: NaiveDate, end: NaiveDate },
    #[error("date arithmetic overflow after {0}")]
    DateOverflow(NaiveDate),
    #[error(transparent)]
    Search(#[from] SearchError),
}

/// Walk-forward configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardConfig {
    #[serde(default = "default_train_months")]
    pub train_months: u32,
    #[serde(default = "default_test_months")]
    pub test_months: u32,
    #[serde(default = "default_step_months")]
    pub step_months: u32,
    /// Minimum train window length in calendar days
    #[serde(default = "default_min_train_samples")]
    pub min_train_samples: i64,
    #[serde(default)]
    pub metric: SearchMetric,
    /// Train/test IC ratio above which a run is flagged as overfit
    #[serde(default = "default_overfitting_threshold")]
    pub overfitting_threshold: f64,
}

fn default_train_months() -> u32 {
    24
}
fn default_test_months() -> u32 {
    6
}
fn default_step_months() -> u32 {
    6
}
fn default_min_train_samples() -> i64 {
    252
}
fn default_overfitting_threshold() -> f64 {
    2.0
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            train_months: default_train_months(),
            test_months: default_test_months(),
            step_months: default_step_months(),
            min_train_samples: default_min_train_samples(),
            metric: SearchMetric::default(),
            overfitting_threshold: default_overfitting_threshold(),
        }
    }
}

impl WalkForwardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, months) in [
            ("train_months", self.train_months),
            ("test_months", self.test_months),
            ("step_months", self.step_months),
        ] {
            if months == 0 {
                return Err(ConfigError::out_of_range(field, "must be at least 1"));
            }
        }
        if self.step_months < self.test_months {
            return Err(ConfigError::out_of_range(
                "step_months",
                format!(
                    "{} < test_months {}; test windows would overlap",
                    self.step_months, self.test_months
                ),
            ));
        }
        if !self.overfitting_threshold.is_finite() {
            return Err(ConfigError::NonFinite {
                field: "overfitting_threshold",
                value: self.overfitting_threshold,
            });
        }
        Ok(())
    }
}

/// One train/test split, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub train_start: NaiveDate,
    pub train_end: NaiveDate,
    pub test_start: NaiveDate,
    pub test_end: NaiveDate,
}

impl Window {
    /// Train length in calendar days, counting both ends
    pub fn train_days(&self) -> i64 {
        (self.train_end - self.train_start).num_days() + 1
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "train {} .. {}  test {} .. {}",
            self.train_start, self.train_end, self.test_start, self.test_end
        )
    }
}

/// Outcome of one window
#[derive(Debug, Clone)]
pub struct WindowResult {
    pub window: Window,
    pub best_params: ParamSet,
    pub train_score: f64,
    pub train_ic: f64,
    pub train_icir: f64,
    pub test_ic: f64,
    pub test_icir: f64,
    pub n_candidates: usize,
}

/// Outcome of a walk-forward run
#[derive(Debug, Clone)]
pub struct WalkForwardResult {
    pub windows: Vec<WindowResult>,
    /// Mean train IC over windows with a finite test IC
    pub aggregated_train_ic: f64,
    pub aggregated_test_ic: f64,
    pub aggregated_test_icir: f64,
    pub overfitting_ratio: f64,
    pub overfitting_threshold: f64,
    pub snapshot_id: Option<String>,
    pub metric: SearchMetric,
}

impl WalkForwardResult {
    /// False whenever the ratio is undetermined
    pub fn is_overfit(&self) -> bool {
        self.overfitting_ratio.is_finite() && self.overfitting_ratio > self.overfitting_threshold
    }
}

/// `|train| / |test|`, NaN when either is NaN or test IC is zero
pub fn overfitting_ratio(train_ic: f64, test_ic: f64) -> f64 {
    if train_ic.is_nan() || test_ic.is_nan() || test_ic.abs() <= ZERO_IC_TOLERANCE {
        return f64::NAN;
    }
    train_ic.abs() / test_ic.abs()
}

fn nan_mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

fn metric_or_nan(value: Option<f64>) -> f64 {
    value.unwrap_or(f64::NAN)
}

/// Rolling train/test parameter optimizer
pub struct WalkForwardOptimizer<B> {
    backtester: B,
    config: WalkForwardConfig,
}

impl<B: Backtester> WalkForwardOptimizer<B> {
    pub fn new(backtester: B, config: WalkForwardConfig) -> Result<Self, WalkForwardError> {
        config.validate()?;
        Ok(Self { backtester, config })
    }

    pub fn config(&self) -> &WalkForwardConfig {
        &self.config
    }

    /// Train/test windows covering `[start, end]`
    pub fn generate_windows(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Window>, WalkForwardError> {
        generate_windows(&self.config, start, end)
    }

    /// Best parameters on the window's train period
    pub fn optimize_window<F>(
        &self,
        alpha_factory: F,
        grid: &ParamGrid,
        window: &Window,
        snapshot_id: Option<&str>,
    ) -> Result<SearchResult, WalkForwardError>
    where
        F: Fn(&ParamSet) -> Result<B::Alpha, SearchError>,
    {
        let ctx = SearchContext {
            start: window.train_start,
            end: window.train_end,
            snapshot_id,
            metric: self.config.metric,
        };
        let result = grid_search(alpha_factory, grid, &self.backtester, &ctx)?;
        if result.best_score().is_nan() {
            return Err(WalkForwardError::AllCandidatesNan {
                start: window.train_start,
                end: window.train_end,
            });
        }
        Ok(result)
    }

    /// Walk forward against the backtester's latest snapshot
    pub fn run<F>(
        &self,
        alpha_factory: F,
        grid: &ParamGrid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<WalkForwardResult, WalkForwardError>
    where
        F: Fn(&ParamSet) -> Result<B::Alpha, SearchError>,
    {
        let snapshot_id = self.backtester.latest_snapshot_id();
        match &snapshot_id {
            Some(id) => tracing::info!(snapshot_id = %id, "Locked snapshot for walk-forward run"),
            None => tracing::warn!("Backtester has no snapshot id; windows may read revised data"),
        }
        self.optimize(alpha_factory, grid, start, end, snapshot_id.as_deref())
    }

    /// Walk forward with every backtest pinned to `snapshot_id`
    pub fn optimize<F>(
        &self,
        alpha_factory: F,
        grid: &ParamGrid,
        start: NaiveDate,
        end: NaiveDate,
        snapshot_id: Option<&str>,
    ) -> Result<WalkForwardResult, WalkForwardError>
    where
        F: Fn(&ParamSet) -> Result<B::Alpha, SearchError>,
    {
        let started = Instant::now();
        let windows = self.generate_windows(start, end)?;
        tracing::info!(
            windows = windows.len(),
            train_months = self.config.train_months,
            test_months = self.config.test_months,
            metric = %self.config.metric,
            "Starting walk-forward optimization"
        );

        let mut results = Vec::with_capacity(windows.len());
        for window in &windows {
            let search = self.optimize_window(&alpha_factory, grid, window, snapshot_id)?;
            let best = &search.best;

            let alpha = alpha_factory(&best.params)?;
            let test: BacktestMetrics = self
                .backtester
                .run_backtest(&alpha, window.test_start, window.test_end, snapshot_id)
                .map_err(SearchError::from)?;

            let result = WindowResult {
                window: *window,
                best_params: best.params.clone(),
                train_score: best.score,
                train_ic: metric_or_nan(best.metrics.mean_ic),
                train_icir: metric_or_nan(best.metrics.icir),
                test_ic: metric_or_nan(test.mean_ic),
                test_icir: metric_or_nan(test.icir),
                n_candidates: search.candidates.len(),
            };
            tracing::debug!(
                window = %window,
                params = %result.best_params,
                train_ic = result.train_ic,
                test_ic = result.test_ic,
                "Window evaluated"
            );
            results.push(result);
        }
        increment_counter(CounterMetric::WalkForwardWindows, results.len() as u64);

        let valid: Vec<&WindowResult> = results.iter().filter(|r| !r.test_ic.is_nan()).collect();
        if valid.len() < results.len() {
            tracing::warn!(
                excluded = results.len() - valid.len(),
                "Windows with NaN test IC excluded from aggregation"
            );
        }
        let aggregated_train_ic = nan_mean(valid.iter().map(|r| r.train_ic));
        let aggregated_test_ic = nan_mean(valid.iter().map(|r| r.test_ic));
        let aggregated_test_icir = nan_mean(valid.iter().map(|r| r.test_icir));
        let ratio = overfitting_ratio(aggregated_train_ic, aggregated_test_ic);

        set_gauge(GaugeMetric::OverfittingRatio, ratio);
        record_latency(LatencyMetric::WalkForward, started.elapsed());

        let result = WalkForwardResult {
            windows: results,
            aggregated_train_ic,
            aggregated_test_ic,
            aggregated_test_icir,
            overfitting_ratio: ratio,
            overfitting_threshold: self.config.overfitting_threshold,
            snapshot_id: snapshot_id.map(str::to_string),
            metric: self.config.metric,
        };
        tracing::info!(
            train_ic = result.aggregated_train_ic,
            test_ic = result.aggregated_test_ic,
            overfitting_ratio = result.overfitting_ratio,
            overfit = result.is_overfit(),
            "Walk-forward optimization complete"
        );
        Ok(result)
    }
}

/// Train/test windows stepping `step_months` from `start` until a test window passes `end`
pub fn generate_windows(
    config: &WalkForwardConfig,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Window>, WalkForwardError> {
    config.validate()?;
    if config.step_months < config.train_months {
        tracing::warn!(
            step_months = config.step_months,
            train_months = config.train_months,
            "Train windows overlap"
        );
    }

    // Offsets are taken from `start` so month-end clamping never accumulates
    let months_from_start = |months: Option<u32>| {
        months
            .and_then(|m| start.checked_add_months(Months::new(m)))
            .ok_or(WalkForwardError::DateOverflow(start))
    };
    let day_before = |date: NaiveDate| {
        date.checked_sub_days(Days::new(1))
            .ok_or(WalkForwardError::DateOverflow(date))
    };

    let mut windows = Vec::new();
    for k in 0_u32.. {
        let offset = k.checked_mul(config.step_months);
        let test_offset = offset.and_then(|o| o.checked_add(config.train_months));
        let test_start = months_from_start(test_offset)?;
        let test_end = day_before(months_from_start(
            test_offset.and_then(|o| o.checked_add(config.test_months)),
        )?)?;
        if test_end > end {
            break;
        }
        let window = Window {
            train_start: months_from_start(offset)?,
            train_end: day_before(test_start)?,
            test_start,
            test_end,
        };
        if window.train_days() < config.min_train_samples {
            return Err(WalkForwardError::TrainWindowTooShort {
                start: window.train_start,
                end: window.train_end,
                days: window.train_days(),
                min: config.min_train_samples,
            });
        }
        windows.push(window);
    }

    if windows.is_empty() {
        return Err(WalkForwardError::NoWindows { start, end });
    }
    Ok(windows)
}
