//! Integration tests for parameter search and walk-forward optimization

mod log_capture;

use chrono::{Datelike, NaiveDate};
use pit_analytics::optimize::{
    grid_search, random_search, BacktestError, BacktestMetrics, Backtester, Distribution,
    ParamDistributions, ParamGrid, ParamSet, ParamValue, SearchContext, SearchError,
    SearchMetric, WalkForwardConfig, WalkForwardError, WalkForwardOptimizer,
};
use log_capture::capture_warnings;
use std::cell::RefCell;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Lookback-window alpha whose IC peaks at a lookback of 60 days
struct LookbackAlpha {
    lookback: i64,
}

/// Scores alphas deterministically and records every snapshot it is asked for
struct SyntheticBacktester {
    snapshot: Option<String>,
    /// IC scaling applied to test periods starting in this year or later
    decay_from_year: Option<(i32, f64)>,
    seen: RefCell<Vec<Option<String>>>,
}

impl SyntheticBacktester {
    fn new(snapshot: Option<&str>) -> Self {
        Self {
            snapshot: snapshot.map(str::to_string),
            decay_from_year: None,
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl Backtester for SyntheticBacktester {
    type Alpha = LookbackAlpha;

    fn run_backtest(
        &self,
        alpha: &LookbackAlpha,
        start: NaiveDate,
        _end: NaiveDate,
        snapshot_id: Option<&str>,
    ) -> Result<BacktestMetrics, BacktestError> {
        self.seen.borrow_mut().push(snapshot_id.map(str::to_string));
        if alpha.lookback <= 0 {
            return Ok(BacktestMetrics::default());
        }
        let distance = (alpha.lookback - 60) as f64 / 100.0;
        let mut ic = 0.06 - distance * distance;
        if let Some((year, scale)) = self.decay_from_year {
            if start.year() >= year {
                ic *= scale;
            }
        }
        Ok(BacktestMetrics {
            mean_ic: Some(ic),
            icir: Some(ic * 10.0),
            hit_rate: Some(0.5 + ic),
            coverage: Some(0.95),
        })
    }

    fn latest_snapshot_id(&self) -> Option<String> {
        self.snapshot.clone()
    }
}

fn factory(params: &ParamSet) -> Result<LookbackAlpha, SearchError> {
    let lookback = params
        .get("lookback")
        .and_then(ParamValue::as_i64)
        .ok_or_else(|| SearchError::InvalidParams {
            params: params.to_string(),
            reason: "lookback must be an integer".to_string(),
        })?;
    Ok(LookbackAlpha { lookback })
}

fn grid() -> ParamGrid {
    ParamGrid::new().with("lookback", [20_i64, 60, 120])
}

fn config() -> WalkForwardConfig {
    WalkForwardConfig {
        train_months: 12,
        test_months: 6,
        step_months: 6,
        min_train_samples: 300,
        ..Default::default()
    }
}

#[test]
fn test_grid_search_picks_peak() {
    let backtester = SyntheticBacktester::new(None);
    let ctx = SearchContext {
        start: d(2019, 1, 1),
        end: d(2019, 12, 31),
        snapshot_id: None,
        metric: SearchMetric::Icir,
    };
    let result = grid_search(factory, &grid(), &backtester, &ctx).unwrap();
    assert_eq!(result.best_params().get("lookback"), Some(&ParamValue::Int(60)));
    assert!((result.best_score() - 0.6).abs() < 1e-12);
}

#[test]
fn test_random_search_reproducible() {
    let mut dists = ParamDistributions::new();
    dists.insert(
        "lookback".to_string(),
        Distribution::IntRange { low: 10, high: 200 },
    );
    let backtester = SyntheticBacktester::new(None);
    let ctx = SearchContext {
        start: d(2019, 1, 1),
        end: d(2019, 12, 31),
        snapshot_id: Some("snap"),
        metric: SearchMetric::MeanIc,
    };
    let a = random_search(factory, &dists, &backtester, &ctx, 12, 7).unwrap();
    let b = random_search(factory, &dists, &backtester, &ctx, 12, 7).unwrap();
    assert_eq!(a.best_params(), b.best_params());
    assert_eq!(a.candidates, b.candidates);
}

#[test]
fn test_run_locks_latest_snapshot() {
    let backtester = SyntheticBacktester::new(Some("crsp-2024-06-30"));
    let optimizer = WalkForwardOptimizer::new(&backtester, config()).unwrap();
    let result = optimizer
        .run(factory, &grid(), d(2015, 1, 1), d(2018, 12, 31))
        .unwrap();

    // Windows test 2016H1 .. 2018H2
    assert_eq!(result.windows.len(), 6);
    assert_eq!(result.snapshot_id.as_deref(), Some("crsp-2024-06-30"));
    let seen = backtester.seen.borrow();
    assert_eq!(seen.len(), 6 * (3 + 1));
    assert!(seen.iter().all(|s| s.as_deref() == Some("crsp-2024-06-30")));

    for window in &result.windows {
        assert_eq!(window.best_params.get("lookback"), Some(&ParamValue::Int(60)));
        assert_eq!(window.n_candidates, 3);
    }
    assert!((result.aggregated_test_ic - 0.06).abs() < 1e-12);
    assert!((result.overfitting_ratio - 1.0).abs() < 1e-12);
    assert!(!result.is_overfit());
}

#[test]
fn test_decaying_alpha_is_overfit() {
    let mut backtester = SyntheticBacktester::new(None);
    // Test periods from 2016 on keep a fifth of the train IC
    backtester.decay_from_year = Some((2016, 0.2));
    let optimizer = WalkForwardOptimizer::new(&backtester, config()).unwrap();
    let result = optimizer
        .optimize(factory, &grid(), d(2015, 1, 1), d(2016, 12, 31), Some("pinned"))
        .unwrap();

    assert_eq!(result.windows.len(), 2);
    assert_eq!(result.snapshot_id.as_deref(), Some("pinned"));
    assert!((result.overfitting_ratio - 5.0).abs() < 1e-9);
    assert!(result.is_overfit());
}

#[test]
fn test_zero_test_ic_ratio_undetermined() {
    let mut backtester = SyntheticBacktester::new(None);
    backtester.decay_from_year = Some((2016, 0.0));
    let optimizer = WalkForwardOptimizer::new(&backtester, config()).unwrap();
    let result = optimizer
        .optimize(factory, &grid(), d(2015, 1, 1), d(2016, 12, 31), None)
        .unwrap();
    assert!(result.overfitting_ratio.is_nan());
    assert!(!result.is_overfit());
}

#[test]
fn test_all_nan_window_errors() {
    let backtester = SyntheticBacktester::new(None);
    let optimizer = WalkForwardOptimizer::new(&backtester, config()).unwrap();
    let grid = ParamGrid::new().with("lookback", [0_i64, -5]);
    let err = optimizer
        .optimize(factory, &grid, d(2015, 1, 1), d(2016, 12, 31), None)
        .unwrap_err();
    assert!(matches!(err, WalkForwardError::AllCandidatesNan { .. }));
}

#[test]
fn test_overlapping_test_windows_rejected() {
    let backtester = SyntheticBacktester::new(None);
    let bad = WalkForwardConfig {
        step_months: 3,
        ..config()
    };
    assert!(matches!(
        WalkForwardOptimizer::new(&backtester, bad),
        Err(WalkForwardError::Config(_))
    ));
}

#[test]
fn test_generated_test_windows_never_overlap() {
    let backtester = SyntheticBacktester::new(None);
    let cfg = WalkForwardConfig {
        train_months: 24,
        test_months: 3,
        step_months: 4,
        min_train_samples: 252,
        ..Default::default()
    };
    let optimizer = WalkForwardOptimizer::new(&backtester, cfg).unwrap();
    let windows = optimizer.generate_windows(d(2010, 1, 1), d(2020, 12, 31)).unwrap();
    assert!(!windows.is_empty());
    for pair in windows.windows(2) {
        assert!(pair[0].test_end < pair[1].test_start);
    }
    for w in &windows {
        assert!(w.train_end < w.test_start);
        assert!(w.test_end <= d(2020, 12, 31));
    }
}

#[test]
fn test_train_overlap_logs_warning() {
    let backtester = SyntheticBacktester::new(None);
    let optimizer = WalkForwardOptimizer::new(&backtester, config()).unwrap();
    let (windows, logs) = capture_warnings(|| optimizer.generate_windows(d(2015, 1, 1), d(2018, 12, 31)));
    let windows = windows.unwrap();
    assert_eq!(windows.len(), 6);
    assert!(windows[1].train_start < windows[0].train_end);
    assert!(logs.contains("WARN"));
    assert!(logs.contains("Train windows overlap"));
}

#[test]
fn test_rolling_without_overlap_is_quiet() {
    let backtester = SyntheticBacktester::new(None);
    let cfg = WalkForwardConfig {
        step_months: 12,
        ..config()
    };
    let optimizer = WalkForwardOptimizer::new(&backtester, cfg).unwrap();
    let (windows, logs) = capture_warnings(|| optimizer.generate_windows(d(2015, 1, 1), d(2018, 12, 31)));
    assert_eq!(windows.unwrap().len(), 3);
    assert!(!logs.contains("Train windows overlap"));
}
