//! Analytics metrics
//!
//! Recorded through the `metrics` facade. Without an installed recorder
//! every call is a no-op.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Trades priced by the cost model
    Trades,
    /// Trades priced with the ADV floor
    AdvFallbacks,
    /// Trades priced with the volatility floor
    VolatilityFallbacks,
    /// Trades above the participation limit
    ParticipationViolations,
    /// Signals without a complete forward-return window
    ForwardReturnsDropped,
    /// Dates excluded from Rank-IC aggregation
    QuantileDatesSkipped,
    /// Parameter combinations scored
    ParamCandidates,
    /// Walk-forward windows evaluated
    WalkForwardWindows,
}

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Forward-return computation
    ForwardReturns,
    /// Quantile / Rank-IC analysis
    QuantileAnalysis,
    /// Walk-forward optimization
    WalkForward,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Latest mean Rank IC
    MeanRankIc,
    /// Latest implied max capacity
    ImpliedCapacity,
    /// Latest walk-forward overfitting ratio
    OverfittingRatio,
}

fn counter_name(metric: CounterMetric) -> &'static str {
    match metric {
        CounterMetric::Trades => "pit_cost_trades_total",
        CounterMetric::AdvFallbacks => "pit_cost_adv_fallback_total",
        CounterMetric::VolatilityFallbacks => "pit_cost_volatility_fallback_total",
        CounterMetric::ParticipationViolations => "pit_cost_participation_violations_total",
        CounterMetric::ForwardReturnsDropped => "pit_forward_returns_dropped_total",
        CounterMetric::QuantileDatesSkipped => "pit_quantile_dates_skipped_total",
        CounterMetric::ParamCandidates => "pit_param_search_candidates_total",
        CounterMetric::WalkForwardWindows => "pit_walk_forward_windows_total",
    }
}

/// Add to a counter
pub fn increment_counter(metric: CounterMetric, value: u64) {
    if value == 0 {
        return;
    }
    metrics::counter!(counter_name(metric)).increment(value);
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = match metric {
        LatencyMetric::ForwardReturns => "pit_forward_returns_latency_ms",
        LatencyMetric::QuantileAnalysis => "pit_quantile_analysis_latency_ms",
        LatencyMetric::WalkForward => "pit_walk_forward_latency_ms",
    };

    let value_ms = duration.as_secs_f64() * 1_000.0;
    metrics::histogram!(metric_name).record(value_ms);
    tracing::debug!(metric = metric_name, value_ms, "Recording latency");
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::MeanRankIc => "pit_quantile_mean_rank_ic",
        GaugeMetric::ImpliedCapacity => "pit_cost_implied_capacity_usd",
        GaugeMetric::OverfittingRatio => "pit_walk_forward_overfitting_ratio",
    };

    if value.is_finite() {
        metrics::gauge!(metric_name).set(value);
    }
}

/// Install a process-wide Prometheus recorder without an HTTP listener
pub fn install_prometheus_recorder() -> anyhow::Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics recorder: {}", e))
}
