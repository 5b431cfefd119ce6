//! Integration tests for forward returns and Rank-IC analysis

mod log_capture;

use chrono::NaiveDate;
use pit_analytics::calendar::{SessionCalendar, TradingCalendar};
use pit_analytics::quantile::{
    compute_rank_ic, run_quantile_analysis, QuantileAnalysisConfig, QuantileAnalyzer,
    QuantileError,
};
use pit_analytics::returns::{
    DailyReturn, ForwardReturnsError, ForwardReturnsProvider, InMemoryReturns, SignalObservation,
};
use log_capture::capture_warnings;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn calendar() -> Arc<dyn TradingCalendar> {
    Arc::new(SessionCalendar::weekdays(
        d(2023, 1, 1),
        d(2023, 12, 31),
        &[d(2023, 1, 2), d(2023, 7, 4)],
    ))
}

fn sessions() -> Vec<NaiveDate> {
    calendar().sessions_in_range(d(2023, 1, 1), d(2023, 12, 31)).unwrap()
}

#[test]
fn test_rank_ic_sign() {
    let signal = [1.0, 2.0, 3.0, 4.0, 5.0];
    let up = [0.1, 0.2, 0.3, 0.4, 0.5];
    let down = [0.5, 0.4, 0.3, 0.2, 0.1];
    assert!((compute_rank_ic(&signal, &up).unwrap() - 1.0).abs() < 1e-12);
    assert!((compute_rank_ic(&signal, &down).unwrap() + 1.0).abs() < 1e-12);
    assert_eq!(compute_rank_ic(&[1.0; 5], &up), None);
    assert_eq!(compute_rank_ic(&signal, &[0.2; 5]), None);
}

#[test]
fn test_look_ahead_guards() {
    assert!(QuantileAnalysisConfig::new(5, 20, 20, 10, 0).is_err());

    let provider = ForwardReturnsProvider::new(calendar(), InMemoryReturns::default());
    let signals = [SignalObservation {
        signal_date: d(2023, 3, 1),
        permno: 1,
        signal_value: 1.0,
    }];
    let err = provider.get_forward_returns(&signals, 0, 5).unwrap_err();
    assert!(matches!(err, ForwardReturnsError::InvalidWindow(_)));
}

#[test]
fn test_partial_window_dropped() {
    let sessions = sessions();
    let signal_idx = 40;
    let signal_date = sessions[signal_idx];
    // Only 3 of the 10 required sessions have data
    let daily: Vec<DailyReturn> = sessions[signal_idx + 1..signal_idx + 4]
        .iter()
        .map(|date| DailyReturn {
            permno: 7,
            date: *date,
            ret: 0.01,
        })
        .collect();
    let provider = ForwardReturnsProvider::new(calendar(), InMemoryReturns::new(daily));
    let signals = [SignalObservation {
        signal_date,
        permno: 7,
        signal_value: 1.0,
    }];
    let out = provider.get_forward_returns(&signals, 1, 10).unwrap();
    assert!(out.is_empty());
}

#[test]
fn test_forward_window_skips_signal_day() {
    let sessions = sessions();
    let signal_idx = 10;
    let daily: Vec<DailyReturn> = sessions[signal_idx..signal_idx + 6]
        .iter()
        .enumerate()
        .map(|(i, date)| DailyReturn {
            permno: 3,
            date: *date,
            // A huge return on the signal day itself must never be used
            ret: if i == 0 { 10.0 } else { 0.01 },
        })
        .collect();
    let provider = ForwardReturnsProvider::new(calendar(), InMemoryReturns::new(daily));
    let signals = [SignalObservation {
        signal_date: sessions[signal_idx],
        permno: 3,
        signal_value: 1.0,
    }];
    let out = provider.get_forward_returns(&signals, 1, 5).unwrap();
    assert_eq!(out.len(), 1);
    assert!((out[0].forward_return - (1.01_f64.powi(5) - 1.0)).abs() < 1e-12);
}

#[test]
fn test_predictive_signal_has_positive_ic() {
    let sessions = sessions();
    let n_permnos = 50_i64;

    let mut rng = ChaCha8Rng::seed_from_u64(42);

    // Each permno's daily return has a persistent drift proportional to its quality
    let quality: Vec<f64> = (0..n_permnos).map(|_| rng.gen_range(-0.5..0.5)).collect();
    let mut daily = Vec::new();
    for date in &sessions {
        for permno in 0..n_permnos {
            daily.push(DailyReturn {
                permno,
                date: *date,
                ret: 0.002 * quality[permno as usize] + 0.01 * rng.gen_range(-0.5..0.5),
            });
        }
    }

    // Signals every 10 sessions: quality plus a little noise
    let mut signals = Vec::new();
    for date in sessions.iter().take(200).step_by(10) {
        for permno in 0..n_permnos {
            signals.push(SignalObservation {
                signal_date: *date,
                permno,
                signal_value: quality[permno as usize] + 0.1 * rng.gen_range(-0.5..0.5),
            });
        }
    }

    let provider = ForwardReturnsProvider::new(calendar(), InMemoryReturns::new(daily));
    let config = QuantileAnalysisConfig::new(5, 20, 25, 10, 1).unwrap();
    let result = run_quantile_analysis(&signals, &provider, &config, "quality", "synthetic").unwrap();

    assert_eq!(result.n_dates, 20);
    assert!(result.mean_rank_ic > 0.0);
    assert!(result.rank_ic_t_stat > 0.0);
    assert_eq!(result.quantile_returns.len(), 5);
    assert!(result.long_short_spread.unwrap() > 0.0);
    assert_eq!(result.daily_ic.len(), result.n_dates);
    let p = result.rank_ic_p_value.unwrap();
    assert!((0.0..=1.0).contains(&p));
    assert_eq!(
        result.n_observations_per_quantile.values().sum::<usize>(),
        20 * n_permnos as usize
    );
    assert!(result.format_table().contains("quality"));
}

#[test]
fn test_too_few_dates_is_insufficient_data() {
    let sessions = sessions();
    let signals: Vec<SignalObservation> = (0..10)
        .map(|permno| SignalObservation {
            signal_date: sessions[5],
            permno,
            signal_value: permno as f64,
        })
        .collect();
    let daily: Vec<DailyReturn> = sessions[5..12]
        .iter()
        .flat_map(|date| {
            (0..10).map(move |permno| DailyReturn {
                permno,
                date: *date,
                ret: 0.001 * permno as f64,
            })
        })
        .collect();
    let provider = ForwardReturnsProvider::new(calendar(), InMemoryReturns::new(daily));
    let config = QuantileAnalysisConfig::new(5, 5, 10, 3, 1).unwrap();
    let err = run_quantile_analysis(&signals, &provider, &config, "s", "u").unwrap_err();
    assert!(matches!(err, QuantileError::InsufficientData(_)));
}

#[test]
fn test_holiday_signal_maps_to_previous_session() {
    let analyzer = QuantileAnalyzer::new(calendar(), QuantileAnalysisConfig::new(2, 1, 4, 1, 1).unwrap());
    // 2023-07-04 is a holiday; its signals belong to 2023-07-03
    let signals: Vec<SignalObservation> = (0..4)
        .map(|permno| SignalObservation {
            signal_date: d(2023, 7, 4),
            permno,
            signal_value: permno as f64,
        })
        .collect();
    let returns: Vec<_> = (0..4)
        .map(|permno| pit_analytics::returns::ForwardReturn {
            signal_date: d(2023, 7, 3),
            permno,
            forward_return: 0.01 * permno as f64,
        })
        .collect();
    let result = analyzer.analyze(&signals, &returns, "s", "u").unwrap();
    assert_eq!(result.period_start, d(2023, 7, 3));
    assert!((result.mean_rank_ic - 1.0).abs() < 1e-12);
}

#[test]
fn test_high_drop_rate_logs_survivorship_warning() {
    let sessions = sessions();
    // Only permno 0 has daily returns; the other nine signals have no window
    let daily: Vec<DailyReturn> = sessions[..60]
        .iter()
        .map(|date| DailyReturn {
            permno: 0,
            date: *date,
            ret: 0.001,
        })
        .collect();
    let signals: Vec<SignalObservation> = (0..10_i64)
        .map(|permno| SignalObservation {
            signal_date: sessions[10],
            permno,
            signal_value: permno as f64,
        })
        .collect();
    let provider = ForwardReturnsProvider::new(calendar(), InMemoryReturns::new(daily));

    let (out, logs) = capture_warnings(|| provider.get_forward_returns(&signals, 1, 5));
    assert_eq!(out.unwrap().len(), 1);
    assert!(logs.contains("possible survivorship bias"));
    assert!(logs.contains("dropped=9"));
}

#[test]
fn test_complete_windows_log_no_drop_warning() {
    let sessions = sessions();
    let daily: Vec<DailyReturn> = sessions[..60]
        .iter()
        .flat_map(|date| {
            (0..10_i64).map(move |permno| DailyReturn {
                permno,
                date: *date,
                ret: 0.001,
            })
        })
        .collect();
    let signals: Vec<SignalObservation> = (0..10_i64)
        .map(|permno| SignalObservation {
            signal_date: sessions[10],
            permno,
            signal_value: permno as f64,
        })
        .collect();
    let provider = ForwardReturnsProvider::new(calendar(), InMemoryReturns::new(daily));

    let (out, logs) = capture_warnings(|| provider.get_forward_returns(&signals, 1, 5));
    assert_eq!(out.unwrap().len(), 10);
    assert!(!logs.contains("survivorship"));
}
