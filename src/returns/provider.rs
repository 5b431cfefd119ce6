//! Forward-return computation over a session index
//!
//! Every session in the span gets an integer index and each permno's daily
//! returns become one series sorted by that index. A signal on session i owns
//! the window [i + skip_days, i + skip_days + holding_period), located in its
//! permno's series with two binary searches.

use super::source::DailyReturnsSource;
use super::types::{DailyReturn, ForwardReturn, ForwardReturnsError, SignalObservation};
use crate::calendar::{Direction, TradingCalendar};
use crate::config::ConfigError;
use crate::telemetry::{increment_counter, record_latency, CounterMetric, LatencyMetric};
use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

/// Extra sessions fetched past the last window for holiday clusters
pub const SESSION_SAFETY_MARGIN: usize = 5;

/// Drop rate above which missing windows are reported
pub const HIGH_DROP_RATE: f64 = 0.10;

/// Computes forward returns for signals against a daily return source
pub struct ForwardReturnsProvider<S> {
    calendar: Arc<dyn TradingCalendar>,
    source: S,
}

impl<S: DailyReturnsSource> ForwardReturnsProvider<S> {
    pub fn new(calendar: Arc<dyn TradingCalendar>, source: S) -> Self {
        Self { calendar, source }
    }

    pub fn calendar(&self) -> &Arc<dyn TradingCalendar> {
        &self.calendar
    }

    /// Compounded forward return per `(signal_date, permno)`
    ///
    /// Signal dates are normalized to the previous session. Only signals with
    /// a complete window of `holding_period` daily returns produce a row.
    pub fn get_forward_returns(
        &self,
        signals: &[SignalObservation],
        skip_days: usize,
        holding_period: usize,
    ) -> Result<Vec<ForwardReturn>, ForwardReturnsError> {
        validate_window(skip_days, holding_period)?;
        if signals.is_empty() {
            return Ok(Vec::new());
        }
        let started = Instant::now();

        let normalized = self.normalize_dates(signals.iter().map(|s| s.signal_date));
        let keys: BTreeSet<(NaiveDate, i64)> = signals
            .iter()
            .map(|s| (normalized[&s.signal_date], s.permno))
            .collect();

        let (Some(first), Some(last)) = (
            keys.iter().map(|k| k.0).min(),
            keys.iter().map(|k| k.0).max(),
        ) else {
            return Ok(Vec::new());
        };
        let span_end = self.span_end(last, skip_days + holding_period + SESSION_SAFETY_MARGIN);

        let sessions = self.calendar.sessions_in_range(first, span_end)?;
        let session_index: HashMap<NaiveDate, usize> = sessions
            .iter()
            .enumerate()
            .map(|(i, d)| (*d, i))
            .collect();

        let permnos: Vec<i64> = keys
            .iter()
            .map(|k| k.1)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let daily = self.source.daily_returns(&permnos, first, span_end)?;
        let indexed = index_returns(&daily, &session_index);

        let mut out = Vec::with_capacity(keys.len());
        for (signal_date, permno) in &keys {
            let Some(&signal_idx) = session_index.get(signal_date) else {
                continue;
            };
            let Some(series) = indexed.get(permno) else {
                continue;
            };
            let lo = signal_idx + skip_days;
            let hi = lo + holding_period;
            let start = series.partition_point(|(idx, _)| *idx < lo);
            let end = series.partition_point(|(idx, _)| *idx < hi);
            let window = &series[start..end];
            if window.len() != holding_period {
                continue;
            }
            let forward_return = window.iter().fold(1.0, |acc, (_, r)| acc * (1.0 + r)) - 1.0;
            out.push(ForwardReturn {
                signal_date: *signal_date,
                permno: *permno,
                forward_return,
            });
        }

        let dropped = keys.len() - out.len();
        let drop_rate = dropped as f64 / keys.len() as f64;
        if drop_rate > HIGH_DROP_RATE {
            tracing::warn!(
                dropped,
                total = keys.len(),
                drop_pct = drop_rate * 100.0,
                "Many signals lack a complete forward window; possible survivorship bias"
            );
        }
        increment_counter(CounterMetric::ForwardReturnsDropped, dropped as u64);
        record_latency(LatencyMetric::ForwardReturns, started.elapsed());

        tracing::debug!(
            signals = keys.len(),
            returned = out.len(),
            skip_days,
            holding_period,
            "Computed forward returns"
        );
        Ok(out)
    }

    /// Map each distinct date to its previous-or-equal session
    ///
    /// Dates the calendar cannot map keep their original value.
    fn normalize_dates(&self, dates: impl Iterator<Item = NaiveDate>) -> HashMap<NaiveDate, NaiveDate> {
        let unique: BTreeSet<NaiveDate> = dates.collect();
        unique
            .into_iter()
            .map(|date| {
                let session = self
                    .calendar
                    .date_to_session(date, Direction::Previous)
                    .unwrap_or_else(|e| {
                        tracing::debug!(%date, error = %e, "Keeping un-normalized signal date");
                        date
                    });
                (date, session)
            })
            .collect()
    }

    /// Last date needed to cover `sessions` sessions after `last`
    fn span_end(&self, last: NaiveDate, sessions: usize) -> NaiveDate {
        self.calendar
            .date_to_session(last, Direction::Previous)
            .and_then(|anchor| self.calendar.session_offset(anchor, sessions as i64))
            .unwrap_or_else(|e| {
                // Beyond the calendar: approximate with calendar days
                let days = (sessions as i64 * 7).div_euclid(5) + 7;
                tracing::debug!(error = %e, days, "Session offset unavailable, using calendar days");
                last + Duration::days(days)
            })
    }
}

/// Skip/holding window validation shared with the quantile config
pub(crate) fn validate_window(skip_days: usize, holding_period: usize) -> Result<(), ConfigError> {
    if skip_days < 1 {
        return Err(ConfigError::out_of_range(
            "skip_days",
            "must be >= 1 to avoid look-ahead bias",
        ));
    }
    if holding_period == 0 {
        return Err(ConfigError::out_of_range("holding_period", "must be > 0"));
    }
    Ok(())
}

/// Per-permno `(session_index, return)` sorted by index
///
/// Duplicate `(permno, date)` rows are averaged; non-finite returns and
/// non-session dates are dropped.
fn index_returns(
    daily: &[DailyReturn],
    session_index: &HashMap<NaiveDate, usize>,
) -> HashMap<i64, Vec<(usize, f64)>> {
    let mut sums: BTreeMap<(i64, usize), (f64, usize)> = BTreeMap::new();
    for row in daily {
        if !row.ret.is_finite() {
            continue;
        }
        let Some(&idx) = session_index.get(&row.date) else {
            continue;
        };
        let entry = sums.entry((row.permno, idx)).or_insert((0.0, 0));
        entry.0 += row.ret;
        entry.1 += 1;
    }

    let mut indexed: HashMap<i64, Vec<(usize, f64)>> = HashMap::new();
    // BTreeMap order keeps each series sorted by index
    for ((permno, idx), (sum, count)) in sums {
        indexed
            .entry(permno)
            .or_default()
            .push((idx, sum / count as f64));
    }
    indexed
}
