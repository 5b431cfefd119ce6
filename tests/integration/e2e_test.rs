//! End-to-end integration tests

mod log_capture;

use chrono::{Datelike, NaiveDate, Weekday};
use pit_analytics::calendar::TradingCalendar;
use pit_analytics::config::{Config, SessionSource};
use pit_analytics::cost::{
    compute_capacity_analysis, compute_cost_summary, compute_daily_costs_permno,
    compute_net_returns, DailyBar, PermnoWeight, PortfolioReturn,
};
use pit_analytics::data::{tables, ParquetReader, ParquetWriter, RunSummary, SUMMARY_FILE};
use pit_analytics::quantile::run_quantile_analysis;
use pit_analytics::returns::{DailyReturn, ForwardReturnsProvider, InMemoryReturns, SignalObservation};
use log_capture::capture_warnings;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_config_example_loads() {
    let config: Config = toml::from_str(include_str!("../../config.toml.example")).unwrap();
    assert_eq!(config.quantile.n_quantiles(), 5);
    assert_eq!(config.walk_forward.train_months, 24);
    assert_eq!(config.cost_model.portfolio_value_usd(), 1_000_000.0);
}

fn small_config() -> Config {
    toml::from_str(
        r#"
        [quantile]
        n_quantiles = 3
        holding_period_days = 5
        min_observations_per_date = 9
        min_total_dates = 5
        skip_days = 1

        [calendar]
        start = "2024-01-01"
        end = "2024-12-31"
        holidays = ["2024-01-01", "2024-01-15"]
    "#,
    )
    .unwrap()
}

#[test]
fn test_quantile_from_parquet_tables() {
    let config = small_config();
    let calendar = config.calendar.build();
    let sessions = calendar
        .sessions_in_range(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), NaiveDate::from_ymd_opt(2024, 6, 30).unwrap())
        .unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(11);

    let mut daily = Vec::new();
    for date in &sessions {
        for permno in 0..12_i64 {
            daily.push(DailyReturn {
                permno,
                date: *date,
                ret: 0.0005 * permno as f64 + rng.gen_range(-0.001..0.001),
            });
        }
    }
    let signals: Vec<SignalObservation> = sessions
        .iter()
        .take(40)
        .step_by(5)
        .flat_map(|date| {
            (0..12_i64).map(move |permno| SignalObservation {
                signal_date: *date,
                permno,
                signal_value: permno as f64,
            })
        })
        .collect();

    let temp_dir = TempDir::new().unwrap();
    let writer = ParquetWriter::new(temp_dir.path());
    let signals_path = writer.write_signals(&signals).unwrap();
    let returns_path = writer.write_daily_returns(&daily).unwrap();

    let signals = ParquetReader::new(signals_path).read_signals().unwrap();
    let daily = ParquetReader::new(returns_path).read_daily_returns().unwrap();
    let provider = ForwardReturnsProvider::new(Arc::new(calendar), InMemoryReturns::new(daily));
    let result =
        run_quantile_analysis(&signals, &provider, &config.quantile, "size", "twelve").unwrap();
    assert_eq!(result.n_dates, 8);
    assert!(result.mean_rank_ic > 0.5);

    let ic_path = writer.write_daily_ic(&result.daily_ic).unwrap();
    assert_eq!(ic_path, writer.table_path(tables::DAILY_IC));
    let daily_ic = ParquetReader::new(ic_path).read_daily_ic().unwrap();
    assert_eq!(daily_ic, result.daily_ic);
}

#[test]
fn test_costs_to_summary_json() {
    let config = small_config();
    let calendar = config.calendar.build();
    let sessions = calendar
        .sessions_in_range(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), NaiveDate::from_ymd_opt(2024, 4, 30).unwrap())
        .unwrap();

    let mut bars = Vec::new();
    let mut weights = Vec::new();
    let mut gross = Vec::new();
    for (i, date) in sessions.iter().enumerate() {
        for permno in 1..=3_i64 {
            bars.push(DailyBar {
                permno,
                date: *date,
                price: Some(50.0 + permno as f64),
                volume: Some(200_000.0),
                ret: Some(if i % 2 == 0 { 0.01 } else { -0.008 }),
            });
            weights.push(PermnoWeight {
                date: *date,
                entity: permno,
                weight: if (i as i64 + permno) % 3 == 0 { 0.4 } else { 0.3 },
            });
        }
        gross.push(PortfolioReturn {
            date: *date,
            gross_return: 0.001,
        });
    }

    let temp_dir = TempDir::new().unwrap();
    let writer = ParquetWriter::new(temp_dir.path());
    let bars_path = writer.write_daily_bars(&bars).unwrap();
    let bars = ParquetReader::new(bars_path).read_daily_bars().unwrap();
    let adv = pit_analytics::cost::compute_adv_volatility(&bars, pit_analytics::cost::ADV_WINDOW_DAYS);

    let costs = compute_daily_costs_permno(&weights, &adv, &config.cost_model);
    // The first 20 sessions per permno have no lagged window and fall back
    assert_eq!(costs.diagnostics.adv_fallback_count, costs.trades.iter().filter(|t| t.trade_date <= sessions[19]).count());

    let net = compute_net_returns(&gross, &costs.cost_drag);
    let summary = compute_cost_summary(&net, &costs.trades);
    let capacity = compute_capacity_analysis(&weights, &costs.trades, &summary, &config.cost_model);
    writer.write_net_returns(&net).unwrap();

    let path = RunSummary::new(Some("snap-e2e".to_string()))
        .with_dataset_version("daily_bars", "2024-05-01")
        .with_costs(&summary, &capacity, &config.cost_model)
        .write(temp_dir.path())
        .unwrap();
    assert_eq!(path, temp_dir.path().join(SUMMARY_FILE));

    let loaded = RunSummary::read(&path).unwrap();
    assert_eq!(loaded.snapshot_id.as_deref(), Some("snap-e2e"));
    assert_eq!(loaded.cost_summary().unwrap(), Some(summary));
    assert_eq!(loaded.capacity_analysis().unwrap(), Some(capacity));
    assert_eq!(loaded.cost_model_config().unwrap().as_ref(), Some(&config.cost_model));

    let net_read = ParquetReader::new(writer.table_path(tables::NET_PORTFOLIO_RETURNS))
        .read_net_returns()
        .unwrap();
    assert_eq!(net_read, net);
}

/// Every 2024 weekday except MLK Day and Presidents' Day
fn returns_2024_without_holidays(permno: i64) -> Vec<DailyReturn> {
    let holidays = [
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        NaiveDate::from_ymd_opt(2024, 2, 19).unwrap(),
    ];
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .iter_days()
        .take_while(|d| d.year() == 2024)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .filter(|d| !holidays.contains(d))
        .map(|date| DailyReturn {
            permno,
            date,
            ret: 0.001,
        })
        .collect()
}

fn january_signals(daily: &[DailyReturn]) -> Vec<SignalObservation> {
    daily
        .iter()
        .filter(|r| r.date.month() == 1)
        .map(|r| SignalObservation {
            signal_date: r.date,
            permno: r.permno,
            signal_value: 1.0,
        })
        .collect()
}

#[test]
fn test_example_calendar_keeps_windows_across_holidays() {
    let config: Config = toml::from_str(include_str!("../../config.toml.example")).unwrap();
    assert_eq!(config.calendar.sessions, SessionSource::Returns);

    let daily = returns_2024_without_holidays(1);
    let signals = january_signals(&daily);
    assert_eq!(signals.len(), 22);

    let calendar = config.calendar.build_for_returns(daily.iter().map(|r| r.date));
    let provider = ForwardReturnsProvider::new(Arc::new(calendar), InMemoryReturns::new(daily));
    let (out, logs) = capture_warnings(|| provider.get_forward_returns(&signals, 1, 20));
    let out = out.unwrap();

    assert_eq!(out.len(), signals.len());
    let expected = 1.001_f64.powi(20) - 1.0;
    assert!(out.iter().all(|f| (f.forward_return - expected).abs() < 1e-12));
    assert!(!logs.contains("survivorship"));
}

#[test]
fn test_weekday_calendar_without_holidays_warns() {
    let mut config: Config = toml::from_str(include_str!("../../config.toml.example")).unwrap();
    config.calendar.sessions = SessionSource::Weekdays;

    let daily = returns_2024_without_holidays(1);
    let signals = january_signals(&daily);
    let (calendar, logs) =
        capture_warnings(|| config.calendar.build_for_returns(daily.iter().map(|r| r.date)));
    assert!(logs.contains("Weekday calendar has no holidays"));

    // Holidays count as sessions, so only windows between them survive (Jan 16-19)
    let provider = ForwardReturnsProvider::new(Arc::new(calendar), InMemoryReturns::new(daily));
    let (out, logs) = capture_warnings(|| provider.get_forward_returns(&signals, 1, 20));
    assert_eq!(out.unwrap().len(), 4);
    assert!(logs.contains("possible survivorship bias"));
}
