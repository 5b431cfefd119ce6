//! Cross-sectional Rank-IC and quantile-return analysis

use super::rank_ic::{assign_quantiles, compute_rank_ic};
use super::types::{DailyIc, QuantileAnalysisConfig, QuantileError, QuantileResult};
use crate::calendar::{Direction, TradingCalendar};
use crate::returns::{ForwardReturn, SignalObservation};
use crate::telemetry::{
    increment_counter, record_latency, set_gauge, CounterMetric, GaugeMetric, LatencyMetric,
};
use chrono::NaiveDate;
use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

/// Why a signal date was left out of the aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SkipReason {
    NotASession,
    NoReturns,
    TooFewObservations,
    UndefinedIc,
}

/// Computes Rank IC and quantile profiles for a signal
pub struct QuantileAnalyzer {
    calendar: Arc<dyn TradingCalendar>,
    config: QuantileAnalysisConfig,
}

impl QuantileAnalyzer {
    pub fn new(calendar: Arc<dyn TradingCalendar>, config: QuantileAnalysisConfig) -> Self {
        Self { calendar, config }
    }

    pub fn config(&self) -> &QuantileAnalysisConfig {
        &self.config
    }

    /// Analyze a signal against its forward returns
    pub fn analyze(
        &self,
        signals: &[SignalObservation],
        forward_returns: &[ForwardReturn],
        signal_name: &str,
        universe_name: &str,
    ) -> Result<QuantileResult, QuantileError> {
        if signals.is_empty() {
            return Err(QuantileError::InsufficientData("no signals".to_string()));
        }
        if forward_returns.is_empty() {
            return Err(QuantileError::InsufficientData(
                "no forward returns".to_string(),
            ));
        }
        let started = Instant::now();

        let signal_by_key = self.normalized_signals(signals);
        let returns_by_key = average_by_key(
            forward_returns
                .iter()
                .map(|r| ((r.signal_date, r.permno), r.forward_return)),
        );

        let signal_dates: BTreeSet<NaiveDate> = signal_by_key.keys().map(|k| k.0).collect();
        let return_dates: BTreeSet<NaiveDate> = returns_by_key.keys().map(|k| k.0).collect();

        let mut joined: BTreeMap<NaiveDate, Vec<(f64, f64)>> = BTreeMap::new();
        for (key, signal) in &signal_by_key {
            let Some(ret) = returns_by_key.get(key) else {
                continue;
            };
            if signal.is_finite() && ret.is_finite() {
                joined.entry(key.0).or_default().push((*signal, *ret));
            }
        }
        if joined.is_empty() {
            return Err(QuantileError::InsufficientData(
                "no overlap between signals and forward returns".to_string(),
            ));
        }

        let n_quantiles = self.config.n_quantiles();
        let mut daily_ic = Vec::new();
        let mut bucket_means: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
        let mut bucket_counts: BTreeMap<usize, usize> = BTreeMap::new();
        let mut skipped: HashMap<SkipReason, usize> = HashMap::new();

        for date in &signal_dates {
            let rows = joined.get(date);
            let reason = if !self.calendar.is_session(*date) {
                Some(SkipReason::NotASession)
            } else if !return_dates.contains(date) || rows.is_none() {
                Some(SkipReason::NoReturns)
            } else if rows.map_or(0, Vec::len) < self.config.min_observations_per_date() {
                Some(SkipReason::TooFewObservations)
            } else {
                None
            };
            if let Some(reason) = reason {
                *skipped.entry(reason).or_insert(0) += 1;
                continue;
            }
            let Some(rows) = rows else { continue };

            let signal: Vec<f64> = rows.iter().map(|r| r.0).collect();
            let returns: Vec<f64> = rows.iter().map(|r| r.1).collect();
            let Some(ic) = compute_rank_ic(&signal, &returns) else {
                *skipped.entry(SkipReason::UndefinedIc).or_insert(0) += 1;
                continue;
            };
            daily_ic.push(DailyIc {
                date: *date,
                rank_ic: ic,
                n_obs: rows.len(),
            });

            let mut per_bucket: BTreeMap<usize, (f64, usize)> = BTreeMap::new();
            for (bucket, ret) in assign_quantiles(&signal, n_quantiles).into_iter().zip(&returns) {
                let entry = per_bucket.entry(bucket).or_insert((0.0, 0));
                entry.0 += ret;
                entry.1 += 1;
            }
            for (bucket, (sum, count)) in per_bucket {
                bucket_means
                    .entry(bucket)
                    .or_default()
                    .push(sum / count as f64);
                *bucket_counts.entry(bucket).or_insert(0) += count;
            }
        }

        let n_dates_skipped: usize = skipped.values().sum();
        if n_dates_skipped > 0 {
            tracing::debug!(?skipped, "Skipped signal dates");
        }
        increment_counter(CounterMetric::QuantileDatesSkipped, n_dates_skipped as u64);

        let n_dates = daily_ic.len();
        if n_dates < self.config.min_total_dates() {
            return Err(QuantileError::InsufficientData(format!(
                "{} valid dates, need at least {}",
                n_dates,
                self.config.min_total_dates()
            )));
        }
        let (Some(first), Some(last)) = (daily_ic.first(), daily_ic.last()) else {
            return Err(QuantileError::InsufficientData("no valid dates".to_string()));
        };
        let (period_start, period_end) = (first.date, last.date);

        let ics: Vec<f64> = daily_ic.iter().map(|d| d.rank_ic).collect();
        let stats = IcStatistics::from_series(&ics);

        let quantile_returns: BTreeMap<usize, f64> = bucket_means
            .into_iter()
            .map(|(bucket, means)| (bucket, means.iter().mean()))
            .collect();
        let long_short_spread = match (
            quantile_returns.get(&n_quantiles),
            quantile_returns.get(&1),
        ) {
            (Some(top), Some(bottom)) => Some(top - bottom),
            _ => None,
        };

        set_gauge(GaugeMetric::MeanRankIc, stats.mean);
        record_latency(LatencyMetric::QuantileAnalysis, started.elapsed());
        tracing::info!(
            signal = signal_name,
            n_dates,
            n_dates_skipped,
            mean_rank_ic = stats.mean,
            t_stat = stats.t_stat,
            "Quantile analysis complete"
        );

        Ok(QuantileResult {
            mean_rank_ic: stats.mean,
            rank_ic_std: stats.std,
            rank_ic_t_stat: stats.t_stat,
            rank_ic_positive_pct: stats.positive_pct,
            icir: stats.icir,
            rank_ic_p_value: stats.p_value,
            quantile_returns,
            long_short_spread,
            n_dates,
            n_dates_skipped,
            n_observations_per_quantile: bucket_counts,
            period_start,
            period_end,
            signal_name: signal_name.to_string(),
            universe_name: universe_name.to_string(),
            daily_ic,
        })
    }

    /// Signal values keyed by (previous-session date, permno), duplicates averaged
    fn normalized_signals(&self, signals: &[SignalObservation]) -> BTreeMap<(NaiveDate, i64), f64> {
        let dates: BTreeSet<NaiveDate> = signals.iter().map(|s| s.signal_date).collect();
        let session_of: HashMap<NaiveDate, NaiveDate> = dates
            .into_iter()
            .map(|date| {
                let session = self
                    .calendar
                    .date_to_session(date, Direction::Previous)
                    .unwrap_or(date);
                (date, session)
            })
            .collect();

        average_by_key(signals.iter().map(|s| {
            let date = session_of.get(&s.signal_date).copied().unwrap_or(s.signal_date);
            ((date, s.permno), s.signal_value)
        }))
    }
}

/// Mean of the finite values per key; keys with none finite map to NaN
fn average_by_key(
    rows: impl Iterator<Item = ((NaiveDate, i64), f64)>,
) -> BTreeMap<(NaiveDate, i64), f64> {
    let mut sums: BTreeMap<(NaiveDate, i64), (f64, usize)> = BTreeMap::new();
    for (key, value) in rows {
        let entry = sums.entry(key).or_insert((0.0, 0));
        if value.is_finite() {
            entry.0 += value;
            entry.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(key, (sum, count))| {
            let mean = if count > 0 {
                sum / count as f64
            } else {
                f64::NAN
            };
            (key, mean)
        })
        .collect()
}

/// Significance statistics of a daily IC series
#[derive(Debug, Clone, Copy, PartialEq)]
struct IcStatistics {
    mean: f64,
    std: f64,
    t_stat: f64,
    positive_pct: f64,
    icir: Option<f64>,
    p_value: Option<f64>,
}

impl IcStatistics {
    fn from_series(ics: &[f64]) -> Self {
        let n = ics.len();
        let mean = ics.iter().mean();
        let std = if n >= 2 { ics.iter().std_dev() } else { 0.0 };
        let t_stat = if std > 0.0 {
            mean / (std / (n as f64).sqrt())
        } else {
            0.0
        };
        let positive_pct = ics.iter().filter(|ic| **ic > 0.0).count() as f64 / n as f64 * 100.0;
        let icir = (std > 0.0).then(|| mean / std);
        let p_value = if std > 0.0 && n >= 2 {
            StudentsT::new(0.0, 1.0, (n - 1) as f64)
                .ok()
                .map(|dist| 2.0 * (1.0 - dist.cdf(t_stat.abs())))
        } else {
            None
        };

        Self {
            mean,
            std,
            t_stat,
            positive_pct,
            icir,
            p_value,
        }
    }
}
